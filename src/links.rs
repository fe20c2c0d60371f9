use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::data_models::ExtractedLink;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("`a` is a valid selector"));

/// Collects every anchor in a popup fragment, in document order.
///
/// html5ever recovers from broken markup, so malformed fragments still
/// yield whatever anchors survive parsing.
pub fn extract_links(html: &str) -> Vec<ExtractedLink> {
    let fragment = Html::parse_fragment(html);

    fragment
        .select(&ANCHOR_SELECTOR)
        .map(|anchor| ExtractedLink {
            text: visible_text(anchor.text()),
            url: anchor.value().attr("href").map(str::to_string),
        })
        .collect()
}

fn visible_text<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    let joined = pieces.collect::<String>();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
