use super::{ExtractionContext, StrategyChain, TextMatch};
use crate::model::UNKNOWN_AUTHOR;
use log::warn;

/// Author of the document, or `None` when no strategy finds one. Callers
/// fall back to [`UNKNOWN_AUTHOR`].
pub fn extract_author<'a>(ctx: &ExtractionContext<'a>) -> Option<TextMatch<'a>> {
    let author = ctx
        .profile
        .author
        .iter()
        .fold(StrategyChain::new("author"), |chain, named| {
            chain.strategy(named.css.as_str(), move |ctx: &ExtractionContext<'a>| {
                Ok(TextMatch::first(ctx.document, named)?.map(strip_byline))
            })
        })
        .accept_when(|m: &TextMatch<'a>| !m.text.is_empty() && m.text != UNKNOWN_AUTHOR)
        .run(ctx);

    if author.is_none() {
        warn!("Could not extract author using profile {}", ctx.profile.name());
    }
    author
}

/// Drop a leading "By" so bylines and plain names look the same.
fn strip_byline(mut found: TextMatch<'_>) -> TextMatch<'_> {
    let lower = found.text.to_lowercase();
    if lower.starts_with("by ") || lower.starts_with("by:") {
        found.text = found.text[3..].trim().to_string();
    }
    found
}
