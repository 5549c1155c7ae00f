//! Field extractors. Each field is an ordered chain of strategies; the first
//! candidate the field accepts wins.

use crate::document::{element_text, Document};
use crate::error::ExtractError;
use crate::profile::{CompiledProfile, NamedSelector, SiteProfile};
use log::debug;
use scraper::ElementRef;
use url::Url;

mod author;
mod free_text;
mod images;
mod steps;
mod supplies;
mod title;

pub use author::extract_author;
pub use free_text::extract_free_text;
pub use images::{scan_images, ImageCollector};
pub use steps::{extract_steps, StepMode, StepScan};
pub use supplies::extract_supplies;
pub use title::extract_title;

/// Everything a strategy may look at for one document.
pub struct ExtractionContext<'a> {
    pub document: &'a Document,
    pub base_url: Option<&'a Url>,
    pub profile: &'a CompiledProfile,
}

impl<'a> ExtractionContext<'a> {
    pub fn settings(&self) -> &'a SiteProfile {
        &self.profile.profile
    }

    /// The first configured content area, or `<body>` when none matches.
    pub fn content_root(&self) -> ElementRef<'a> {
        self.document
            .select_family(self.profile.content_roots.iter().map(|n| &n.selector))
            .map(|(_, found)| found[0])
            .unwrap_or_else(|| self.document.body())
    }
}

/// A piece of text together with the element it came from.
#[derive(Debug, Clone)]
pub struct TextMatch<'a> {
    pub text: String,
    pub element: ElementRef<'a>,
}

impl<'a> TextMatch<'a> {
    /// Text of the first element `named` selects, or `None` when nothing
    /// matches.
    pub fn first(
        document: &'a Document,
        named: &NamedSelector,
    ) -> Result<Option<Self>, ExtractError> {
        let Some(element) = document.select_first(&named.selector) else {
            return Ok(None);
        };
        if element.value().name() == "meta" && element.value().attr("content").is_none() {
            return Err(ExtractError::MissingAttribute("content"));
        }
        Ok(Some(Self {
            text: element_text(element),
            element,
        }))
    }

    /// True when the element sits inside `<body>` (not in `<head>` metadata).
    pub fn in_body(&self) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().name() == "body")
    }
}

type StrategyFn<'s, I, T> = Box<dyn Fn(&I) -> Result<Option<T>, ExtractError> + 's>;

/// Ordered fallback strategies for one value.
///
/// Strategies run in insertion order. A strategy that errors counts as "no
/// candidate"; a candidate failing the acceptance predicate is discarded and
/// the next strategy runs. Nothing after the accepted candidate is evaluated.
pub struct StrategyChain<'s, I, T> {
    field: &'static str,
    strategies: Vec<(String, StrategyFn<'s, I, T>)>,
    accept: Box<dyn Fn(&T) -> bool + 's>,
}

impl<'s, I, T> StrategyChain<'s, I, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            accept: Box::new(|_| true),
        }
    }

    pub fn strategy(
        mut self,
        name: impl Into<String>,
        run: impl Fn(&I) -> Result<Option<T>, ExtractError> + 's,
    ) -> Self {
        self.strategies.push((name.into(), Box::new(run)));
        self
    }

    pub fn accept_when(mut self, accept: impl Fn(&T) -> bool + 's) -> Self {
        self.accept = Box::new(accept);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn run(&self, input: &I) -> Option<T> {
        for (name, strategy) in &self.strategies {
            match strategy(input) {
                Ok(Some(candidate)) if (self.accept)(&candidate) => {
                    debug!("{}: accepted candidate from {}", self.field, name);
                    return Some(candidate);
                }
                Ok(Some(_)) => debug!("{}: candidate from {} rejected", self.field, name),
                Ok(None) => {}
                Err(e) => debug!("{}: strategy {} failed: {}", self.field, name, e),
            }
        }
        debug!("{}: no strategy produced an accepted value", self.field);
        None
    }
}
