use super::{ExtractionContext, StrategyChain};
use crate::document::{element_text, forward_elements, heading_level, ElementQuery};
use log::debug;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

static LI_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static LIST_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul, ol").unwrap());

/// Supply list of the document; empty when nothing is found.
pub fn extract_supplies<'a>(ctx: &ExtractionContext<'a>) -> Vec<String> {
    let chain = ctx
        .profile
        .supplies
        .iter()
        .fold(StrategyChain::new("supplies"), |chain, named| {
            chain.strategy(named.css.as_str(), move |ctx: &ExtractionContext<'a>| {
                Ok(ctx.document.select_first(&named.selector).map(list_items))
            })
        })
        .strategy("generic container", |ctx: &ExtractionContext<'a>| {
            Ok(ctx
                .document
                .find_first(&ctx.profile.supplies_container)
                .map(list_items))
        })
        .strategy("heading", |ctx: &ExtractionContext<'a>| Ok(list_after_heading(ctx)))
        .accept_when(|items: &Vec<String>| !items.is_empty());

    let supplies = chain.run(ctx).unwrap_or_default();
    if supplies.is_empty() {
        debug!("Could not find supplies section");
    }
    supplies
}

/// Non-empty normalized texts of the top-level list items under
/// `container`. A nested item is part of its parent's text.
fn list_items(container: ElementRef<'_>) -> Vec<String> {
    container
        .select(&LI_SELECTOR)
        .filter(|item| {
            !item
                .ancestors()
                .take_while(|node| node.id() != container.id())
                .filter_map(ElementRef::wrap)
                .any(|ancestor| ancestor.value().name() == "li")
        })
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Find a heading such as "Things You'll Need" and read the first list
/// that follows it before the next heading.
fn list_after_heading(ctx: &ExtractionContext<'_>) -> Option<Vec<String>> {
    let headings = ElementQuery::tags(&["h2", "h3", "h4", "h5", "h6", "strong"]);
    ctx.document
        .find_all(&headings)
        .into_iter()
        .filter(|heading| ctx.profile.supplies_heading.is_match(&element_text(*heading)))
        .find_map(|heading| {
            let list = forward_elements(heading)
                .take_while(|el| heading_level(el).is_none())
                .find_map(|el| match el.value().name() {
                    "ul" | "ol" => Some(el),
                    _ => el.select(&LIST_SELECTOR).next(),
                })?;
            debug!("Found supplies list after heading '{}'", element_text(heading));
            let items = list_items(list);
            (!items.is_empty()).then_some(items)
        })
}
