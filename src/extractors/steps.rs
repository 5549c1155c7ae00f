use super::{ExtractionContext, ImageCollector, StrategyChain};
use crate::document::{element_text, find_all_in, following_siblings, heading_level, ForwardNode};
use crate::model::StepEntry;
use crate::profile::SiteProfile;
use log::{debug, info};
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static P_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Sibling elements whose text can contribute to a header-delimited step.
const SEGMENT_TAGS: &[&str] = &["p", "div", "section", "li", "ul", "ol", "blockquote"];

/// Which segmentation produced the steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Containers,
    Headings,
    Paragraphs,
    None,
}

/// Steps of a document and the images found inside them.
#[derive(Debug, Clone)]
pub struct StepScan {
    pub steps: Vec<StepEntry>,
    pub images: Vec<String>,
    pub mode: StepMode,
}

/// Segment the document into steps.
///
/// Container mode runs first; header-delimited mode only when no container
/// was found at all; loose paragraphs only when neither produced a step.
pub fn extract_steps(ctx: &ExtractionContext<'_>) -> StepScan {
    let mut images = ImageCollector::new(ctx);
    let settings = ctx.settings();

    let (mut steps, mut mode) = match find_containers(ctx) {
        Some((name, containers)) => {
            info!("Found {} steps using selector: {}", containers.len(), name);
            let steps = containers
                .into_iter()
                .filter_map(|container| {
                    images.collect_from(container);
                    container_step(ctx, container)
                })
                .collect();
            (steps, StepMode::Containers)
        }
        None => {
            debug!("Could not find step containers, trying step headings");
            (heading_steps(ctx, &mut images), StepMode::Headings)
        }
    };

    if steps.is_empty() && settings.paragraph_fallback {
        steps = paragraph_steps(ctx);
        if !steps.is_empty() {
            mode = StepMode::Paragraphs;
        }
    }
    if steps.is_empty() {
        mode = StepMode::None;
    }

    StepScan {
        steps,
        images: images.into_urls(),
        mode,
    }
}

/// Step containers from the selector family, then the fuzzy class/id
/// search. Returns the name of the rule that matched.
fn find_containers<'a>(ctx: &ExtractionContext<'a>) -> Option<(String, Vec<ElementRef<'a>>)> {
    let containers = &ctx.profile.step_containers;
    if let Some((index, found)) = ctx
        .document
        .select_family(containers.iter().map(|n| &n.selector))
    {
        return Some((containers[index].css.clone(), found));
    }

    let query = ctx.profile.fuzzy_steps.as_ref()?;
    let found = outermost(ctx.document.find_all(query));
    if found.is_empty() {
        return None;
    }
    Some(("flexible class/id matching".to_string(), found))
}

/// Drop every element nested inside another element of the same list.
fn outermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: HashSet<_> = elements.iter().map(|el| el.id()).collect();
    elements
        .into_iter()
        .filter(|el| el.ancestors().all(|a| !ids.contains(&a.id())))
        .collect()
}

/// Input of the per-container body chain.
struct StepScope<'a, 'c> {
    ctx: &'c ExtractionContext<'a>,
    container: ElementRef<'a>,
    headline: Option<&'c str>,
}

fn container_step<'a>(ctx: &ExtractionContext<'a>, container: ElementRef<'a>) -> Option<StepEntry> {
    let settings = ctx.settings();
    let headline = ctx.profile.step_headlines.iter().find_map(|named| {
        container
            .select(&named.selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    });

    let scope = StepScope {
        ctx,
        container,
        headline: headline.as_deref(),
    };

    let body = ctx
        .profile
        .step_bodies
        .iter()
        .fold(StrategyChain::<StepScope, String>::new("step body"), |chain, named| {
            chain.strategy(named.css.as_str(), move |scope| {
                let min = scope.ctx.settings().min_paragraph_length;
                Ok(scope
                    .container
                    .select(&named.selector)
                    .next()
                    .map(element_text)
                    .filter(|text| text.chars().count() > min))
            })
        })
        .strategy("paragraphs", |scope| Ok(paragraph_text(scope)))
        .strategy("container text", |scope| Ok(container_text(scope)))
        .accept_when(|text| !text.is_empty())
        .run(&scope)?;

    if !accept_body(&body, settings) {
        debug!("Discarding step body '{}'", preview(&body));
        return None;
    }
    Some(StepEntry { headline, body })
}

/// Paragraphs of the container long enough to be content, joined.
fn paragraph_text(scope: &StepScope<'_, '_>) -> Option<String> {
    let min = scope.ctx.settings().min_paragraph_length;
    let text = scope
        .container
        .select(&P_SELECTOR)
        .map(element_text)
        .filter(|text| text.chars().count() > min)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Whole container text without its headline, unless it looks like
/// navigation.
fn container_text(scope: &StepScope<'_, '_>) -> Option<String> {
    let settings = scope.ctx.settings();
    let mut text = element_text(scope.container);
    if let Some(headline) = scope.headline {
        if let Some(rest) = text.strip_prefix(headline) {
            text = rest.trim().to_string();
        }
    }

    if text.chars().count() <= settings.min_container_text_length {
        return None;
    }
    let window: String = text
        .to_lowercase()
        .chars()
        .take(settings.exclusion_window)
        .collect();
    if settings
        .exclusion_keywords
        .iter()
        .any(|keyword| window.contains(&keyword.to_lowercase()))
    {
        return None;
    }
    Some(text)
}

/// Final gate for every step body, whatever mode produced it.
fn accept_body(body: &str, settings: &SiteProfile) -> bool {
    let lower = body.to_lowercase();
    body.chars().count() > settings.min_step_length
        && !settings
            .rejected_body_prefixes
            .iter()
            .any(|prefix| lower.starts_with(&prefix.to_lowercase()))
}

fn is_step_heading(text: &str, ctx: &ExtractionContext<'_>) -> bool {
    if ctx.settings().numbered_step_headers {
        return ctx.profile.step_heading.is_match(text);
    }
    let trimmed = text.trim();
    trimmed.to_lowercase().contains("step")
        || (!trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()))
}

/// Steps delimited by "Step N" headings inside the content area.
fn heading_steps(ctx: &ExtractionContext<'_>, images: &mut ImageCollector<'_>) -> Vec<StepEntry> {
    let settings = ctx.settings();
    let root = ctx.content_root();

    let mut steps = Vec::new();
    for heading in find_all_in(root, &ctx.profile.step_headings) {
        let headline = element_text(heading);
        if !is_step_heading(&headline, ctx) {
            continue;
        }
        let level = heading_level(&heading).unwrap_or(6);

        let mut pieces = Vec::new();
        let segment =
            following_siblings(heading, |el| heading_level(el).is_some_and(|l| l <= level));
        for node in segment {
            match node {
                ForwardNode::Text(text) => pieces.push(text),
                ForwardNode::Element(el) => {
                    images.collect_from(el);
                    if !SEGMENT_TAGS.contains(&el.value().name()) {
                        continue;
                    }
                    let text = element_text(el);
                    if text.chars().count() >= settings.min_paragraph_length {
                        pieces.push(text);
                    }
                }
            }
        }

        let body = pieces.join(" ");
        if accept_body(&body, settings) {
            steps.push(StepEntry {
                headline: Some(headline),
                body,
            });
        } else {
            debug!("Step heading '{}' has no usable content", headline);
        }
    }

    if !steps.is_empty() {
        info!("Found {} steps using step headings", steps.len());
    }
    steps
}

/// Loose paragraphs that read like instructions.
fn paragraph_steps(ctx: &ExtractionContext<'_>) -> Vec<StepEntry> {
    let settings = ctx.settings();
    let steps: Vec<StepEntry> = ctx
        .content_root()
        .select(&P_SELECTOR)
        .map(element_text)
        .filter(|text| text.chars().count() > settings.min_fallback_paragraph_length)
        .filter(|text| {
            let lower = text.to_lowercase();
            let window: String = lower.chars().take(100).collect();
            let excluded = settings
                .fallback_exclusion_keywords
                .iter()
                .any(|keyword| window.contains(keyword.as_str()));
            let instructive = text.chars().count() > 100
                || settings
                    .action_words
                    .iter()
                    .any(|word| lower.contains(word.as_str()));
            !excluded && instructive
        })
        .filter(|text| accept_body(text, settings))
        .map(|body| StepEntry {
            headline: None,
            body,
        })
        .collect();

    if !steps.is_empty() {
        info!("Found {} steps in loose paragraphs", steps.len());
    }
    steps
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use url::Url;

    fn scan_with(html: &str, profile: SiteProfile) -> StepScan {
        let document = Document::parse(html);
        let profile = profile.compile().unwrap();
        let base = Url::parse("https://x.com/guide").unwrap();
        let ctx = ExtractionContext {
            document: &document,
            base_url: Some(&base),
            profile: &profile,
        };
        extract_steps(&ctx)
    }

    fn scan(html: &str) -> StepScan {
        scan_with(html, SiteProfile::generic())
    }

    #[test]
    fn test_container_mode_with_body_class() {
        let scan = scan(
            r#"<div class="step"><h2 class="step-title">Step 1: Cut</h2>
                 <div class="step-body">Cut the board into two equal halves.</div>
                 <img src="/img/1.jpg"></div>
               <div class="step"><h2 class="step-title">Step 2: Glue</h2>
                 <div class="step-body">Glue the halves together and clamp them.</div>
                 <img src="/img/2.jpg" class="avatar"></div>"#,
        );
        assert_eq!(scan.mode, StepMode::Containers);
        assert_eq!(scan.steps.len(), 2);
        assert_eq!(scan.steps[0].headline.as_deref(), Some("Step 1: Cut"));
        assert_eq!(scan.steps[1].body, "Glue the halves together and clamp them.");
        assert_eq!(scan.images, vec!["https://x.com/img/1.jpg"]);
    }

    #[test]
    fn test_container_mode_paragraph_fallback() {
        let scan = scan(
            r#"<section class="step"><p>Short</p>
                 <p>Sand every edge until smooth.</p><p>Wipe off the dust.</p></section>"#,
        );
        assert_eq!(scan.steps.len(), 1);
        assert_eq!(scan.steps[0].body, "Sand every edge until smooth. Wipe off the dust.");
    }

    #[test]
    fn test_container_text_navigation_is_rejected() {
        let scan = scan(
            r#"<div class="step">Share this project with friends and family today</div>
               <div class="step"><span>Drill pilot holes before driving screws.</span></div>"#,
        );
        assert_eq!(scan.steps.len(), 1);
        assert_eq!(scan.steps[0].body, "Drill pilot holes before driving screws.");
    }

    #[test]
    fn test_fuzzy_containers_keep_outermost() {
        let scan = scan(
            r#"<div id="step-1"><div class="step-inner"><p>Measure twice before you cut anything.</p></div></div>
               <article class="guide-step"><p>Attach the brackets to the wall studs.</p></article>"#,
        );
        assert_eq!(scan.mode, StepMode::Containers);
        assert_eq!(scan.steps.len(), 2);
    }

    #[test]
    fn test_fuzzy_containers_by_data_attribute() {
        let scan = scan(
            r#"<ol><li data-step="1">Sand the edges smooth with fine sandpaper.</li>
                   <li data-step="2">Wipe the dust off with a damp cloth.</li></ol>"#,
        );
        assert_eq!(scan.mode, StepMode::Containers);
        assert_eq!(scan.steps.len(), 2);
        assert_eq!(scan.steps[1].body, "Wipe the dust off with a damp cloth.");
    }

    #[test]
    fn test_header_delimited_mode() {
        let scan = scan(
            r#"<article>
                 <h2>Step 1</h2><p>Remove the old caulk with a utility knife.</p><img src="/a.jpg">
                 <h3>Tip</h3><p>Work slowly around the corners of the tub.</p>
                 <h2>Step 2</h2><p>Clean the joint with rubbing alcohol.</p>
                 <h2>Conclusion</h2><p>Enjoy your freshly sealed tub for years.</p>
               </article>"#,
        );
        assert_eq!(scan.mode, StepMode::Headings);
        assert_eq!(scan.steps.len(), 2);
        assert_eq!(scan.steps[0].headline.as_deref(), Some("Step 1"));
        assert!(scan.steps[0].body.contains("utility knife"));
        assert!(scan.steps[0].body.contains("corners of the tub"));
        assert_eq!(scan.steps[1].body, "Clean the joint with rubbing alcohol.");
        assert_eq!(scan.images, vec!["https://x.com/a.jpg"]);
    }

    #[test]
    fn test_numbered_headers_only() {
        let profile = SiteProfile {
            numbered_step_headers: true,
            ..SiteProfile::generic()
        };
        let scan = scan_with(
            r#"<h2>Steps overview</h2><p>This section explains the whole process.</p>
               <h2>Step 1 - Prep</h2><p>Turn off the water supply valve first.</p>"#,
            profile,
        );
        assert_eq!(scan.steps.len(), 1);
        assert_eq!(scan.steps[0].headline.as_deref(), Some("Step 1 - Prep"));
    }

    #[test]
    fn test_loose_paragraph_fallback() {
        let scan = scan(
            r#"<div class="article-body">
                 <p>Introduction: this guide is about shelves and nothing else.</p>
                 <p>Measure the wall and mark the stud positions with a pencil.</p>
                 <p>A short aside.</p>
               </div>"#,
        );
        assert_eq!(scan.mode, StepMode::Paragraphs);
        assert_eq!(scan.steps.len(), 1);
        assert!(scan.steps[0].headline.is_none());
    }

    #[test]
    fn test_paragraph_fallback_can_be_disabled() {
        let profile = SiteProfile {
            paragraph_fallback: false,
            ..SiteProfile::generic()
        };
        let scan = scan_with(
            "<p>Measure the wall and mark the stud positions with a pencil.</p>",
            profile,
        );
        assert_eq!(scan.mode, StepMode::None);
        assert!(scan.steps.is_empty());
    }
}
