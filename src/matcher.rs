/// Decides whether an opened popup is the one the search is after.
pub trait PopupMatcher: Send + Sync {
    fn matches(&self, popup_html: &str) -> bool;
}

/// Plain substring containment on the raw popup markup.
#[derive(Debug, Clone)]
pub struct ContainsText(pub String);

impl ContainsText {
    pub fn new(text: impl Into<String>) -> ContainsText {
        ContainsText(text.into())
    }
}

impl PopupMatcher for ContainsText {
    fn matches(&self, popup_html: &str) -> bool {
        popup_html.contains(self.0.as_str())
    }
}

impl<F> PopupMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, popup_html: &str) -> bool {
        self(popup_html)
    }
}
