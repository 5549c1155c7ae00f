//! Candidate guide links on listing (category) pages.

use crate::document::{element_text, Document};
use crate::urls::{parse_base, resolve_url};
use log::{debug, info};
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Absolute http(s) URLs of anchors whose text contains `keyword` (any
/// case), deduplicated, in document order.
pub fn discover_links(document: &Document, base_url: &str, keyword: &str) -> Vec<String> {
    let base = parse_base(base_url);
    let keyword = keyword.to_lowercase();

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select_all(&LINK_SELECTOR) {
        if !element_text(anchor).to_lowercase().contains(&keyword) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match resolve_url(href, base.as_ref()) {
            Some(url) if seen.insert(url.clone()) => links.push(url),
            Some(_) => {}
            None => debug!("Skipping unusable link '{}'", href),
        }
    }

    info!("Discovered {} guide links on {}", links.len(), base_url);
    links
}
