use super::{ExtractionContext, StrategyChain, TextMatch};
use crate::model::UNKNOWN_TITLE;
use log::warn;

/// Title of the document: the first configured selector whose text is
/// non-empty. The required-prefix rule is not applied here.
pub fn extract_title<'a>(ctx: &ExtractionContext<'a>) -> Option<TextMatch<'a>> {
    let title = ctx
        .profile
        .title
        .iter()
        .fold(StrategyChain::new("title"), |chain, named| {
            chain.strategy(named.css.as_str(), move |ctx: &ExtractionContext<'a>| {
                TextMatch::first(ctx.document, named)
            })
        })
        .accept_when(|m: &TextMatch<'a>| !m.text.is_empty() && m.text != UNKNOWN_TITLE)
        .run(ctx);

    if title.is_none() {
        warn!("Could not extract title using profile {}", ctx.profile.name());
    }
    title
}
