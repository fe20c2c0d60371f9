use serde::{Deserialize, Serialize};

use crate::matcher::PopupMatcher;

pub const FOUND_INSTRUCTIONS: &str = "Please display the grit bin information in a clear and friendly way. \
Summarize the details from the popup, and if there are any links, \
list them as clickable Markdown bullet points with their text and URLs. \
Use bullet points for clarity and include all available information.";

pub const NOT_FOUND_INSTRUCTIONS: &str = "Sorry, I couldn't find a grit bin popup for that postcode. \
If you need help, check the attached screenshot for debugging.";

pub const NOT_FOUND_NO_SCREENSHOT_INSTRUCTIONS: &str =
    "Sorry, I couldn't find a grit bin popup for that postcode.";

pub const NOT_FOUND_ERROR: &str = "No grit bin popup found after clicking markers and clusters.";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostcodeInput {
    /// The UK postcode to search, e.g. 'LS28 5UL'.
    pub postcode: String,
}

/// A marker node as seen by one DOM query. The class name is read once at
/// query time; the handle goes stale as soon as the map re-renders.
#[derive(Debug, Clone)]
pub struct MarkerElement<E> {
    pub handle: E,
    pub class_name: Option<String>,
}

impl<E> MarkerElement<E> {
    pub fn new(handle: E, class_name: Option<String>) -> MarkerElement<E> {
        MarkerElement { handle, class_name }
    }
}

/// Serialized outer markup of every marker, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSnapshot(Vec<String>);

impl MarkerSnapshot {
    pub fn new(markup: Vec<String>) -> MarkerSnapshot {
        MarkerSnapshot(markup)
    }

    /// True when the marker count differs or any index-aligned pair differs.
    pub fn diverges_from(&self, other: &MarkerSnapshot) -> bool {
        self.0.len() != other.0.len() || self.0.iter().zip(&other.0).any(|(a, b)| a != b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub html: String,
    pub is_target: bool,
}

impl PopupContent {
    pub fn inspect(html: String, matcher: &dyn PopupMatcher) -> PopupContent {
        let is_target = matcher.matches(&html);
        PopupContent { html, is_target }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    pub text: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    BudgetExhausted,
    NoClusters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(PopupContent),
    NotFound(NotFoundReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Scanning passes started.
    pub attempts: usize,
    /// Cluster clicks issued.
    pub zooms: usize,
}

impl SearchReport {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Found {
        popup_html: String,
        links: Vec<ExtractedLink>,
        display_instructions: String,
    },
    NotFound {
        error: String,
        screenshot: Option<String>,
        display_instructions: String,
    },
}

impl ToolResponse {
    pub fn found(popup_html: String, links: Vec<ExtractedLink>) -> ToolResponse {
        ToolResponse::Found {
            popup_html,
            links,
            display_instructions: FOUND_INSTRUCTIONS.to_string(),
        }
    }

    /// The instructions only point at a screenshot when one was saved.
    pub fn not_found(screenshot: Option<String>) -> ToolResponse {
        let display_instructions = match screenshot {
            Some(_) => NOT_FOUND_INSTRUCTIONS,
            None => NOT_FOUND_NO_SCREENSHOT_INSTRUCTIONS,
        };
        ToolResponse::NotFound {
            error: NOT_FOUND_ERROR.to_string(),
            screenshot,
            display_instructions: display_instructions.to_string(),
        }
    }
}
