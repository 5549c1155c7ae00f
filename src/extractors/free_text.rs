use super::ExtractionContext;
use crate::document::{
    descendant_elements, element_text, find_first_in, forward_elements, heading_level,
};
use log::debug;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

static P_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Introductory prose between `anchor` (the author byline or the title) and
/// the first supplies or steps section, paragraphs separated by a blank line.
///
/// Empty when there is no anchor inside the body.
pub fn extract_free_text(ctx: &ExtractionContext<'_>, anchor: Option<ElementRef<'_>>) -> String {
    let Some(anchor) = anchor else {
        return String::new();
    };
    let min = ctx.settings().min_free_text_length;

    let mut paragraphs = Vec::new();
    for element in forward_elements(anchor) {
        if is_section_boundary(ctx, element) {
            debug!("Free text stops at <{}>", element.value().name());
            break;
        }
        let own = (element.value().name() == "p").then_some(element);
        for paragraph in own.into_iter().chain(element.select(&P_SELECTOR)) {
            let text = element_text(paragraph);
            if text.chars().count() >= min {
                paragraphs.push(text);
            }
        }
    }
    paragraphs.join("\n\n")
}

/// A supplies/steps heading, a step container or supplies list (by selector
/// or by class/id fragment), or an element holding any of them.
fn is_section_boundary(ctx: &ExtractionContext<'_>, element: ElementRef<'_>) -> bool {
    let profile = ctx.profile;
    let is_section_heading = |el: &ElementRef<'_>| {
        heading_level(el).is_some() && profile.section_heading.is_match(&element_text(*el))
    };
    if is_section_heading(&element) || descendant_elements(element).any(|el| is_section_heading(&el)) {
        return true;
    }

    let by_selector = profile
        .step_containers
        .iter()
        .chain(profile.supplies.iter())
        .any(|named| named.selector.matches(&element) || element.select(&named.selector).next().is_some());
    if by_selector {
        return true;
    }

    profile
        .fuzzy_steps
        .iter()
        .chain(std::iter::once(&profile.supplies_container))
        .any(|query| query.matches(&element) || find_first_in(element, query).is_some())
}
