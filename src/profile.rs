use crate::document::{AttrPredicate, ElementQuery};
use crate::error::ImportError;
use regex::{Regex, RegexBuilder};
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Markup conventions and thresholds for one family of sites.
///
/// Every field has a default (the `generic` preset), so a TOML profile only
/// needs to list what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Profile name, used for lookup and in log lines
    pub name: String,
    /// Hosts this profile applies to (exact host or any subdomain of it)
    pub hosts: Vec<String>,

    /// Title candidates, most specific first; `meta` selectors read `content`
    pub title_selectors: Vec<String>,
    pub author_selectors: Vec<String>,

    /// Structurally specific supplies containers, tried before the generic one
    pub supplies_selectors: Vec<String>,
    /// Class/id fragment naming a generic supplies container
    pub supplies_keyword: String,
    /// Heading text that introduces a supplies list
    pub supplies_heading_pattern: String,
    /// Heading text that ends the introduction (supplies or steps sections)
    pub section_heading_pattern: String,

    /// Main content areas, for header-delimited steps and body image scans
    pub content_root_selectors: Vec<String>,

    pub step_container_selectors: Vec<String>,
    /// Class/id fragment for the fuzzy container search; `None` disables it
    pub step_keyword: Option<String>,
    pub step_body_selectors: Vec<String>,
    pub step_headline_selectors: Vec<String>,
    /// Heading tags scanned in header-delimited mode
    pub step_heading_tags: Vec<String>,
    /// Pattern a heading must match when `numbered_step_headers` is set
    pub step_heading_pattern: String,
    pub numbered_step_headers: bool,
    /// Turn loose action paragraphs into steps when no structure is found
    pub paragraph_fallback: bool,

    /// A step body must be strictly longer than this many characters
    pub min_step_length: usize,
    /// Minimum length of a paragraph that contributes to a step body
    pub min_paragraph_length: usize,
    /// Minimum length of a whole-container text used as a step body
    pub min_container_text_length: usize,
    pub min_fallback_paragraph_length: usize,
    pub min_free_text_length: usize,

    /// Navigation words that disqualify a whole-container text
    pub exclusion_keywords: Vec<String>,
    /// How many leading characters are checked for exclusion keywords
    pub exclusion_window: usize,
    pub rejected_body_prefixes: Vec<String>,
    pub fallback_exclusion_keywords: Vec<String>,
    pub action_words: Vec<String>,

    /// Only accept documents whose title starts with this (any case)
    pub required_title_prefix: Option<String>,
    pub decorative_image_keywords: Vec<String>,
    /// Skip images whose declared width or height is below this
    pub min_image_dimension: Option<u32>,
    /// Image source attributes in priority order (lazy loaders first after `src`)
    pub image_source_attributes: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl SiteProfile {
    /// Profile for sites without known conventions.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            hosts: Vec::new(),
            title_selectors: strings(&[
                "h1.how-to__article-title",
                "h1.header-title",
                "h1.title",
                "h1",
                "meta[property=\"og:title\"]",
                "meta[name=\"twitter:title\"]",
                "title",
            ]),
            author_selectors: strings(&[
                "a[rel=\"author\"]",
                "span.author-name",
                "a.author",
                "div.author",
                "[itemprop=\"author\"]",
                "meta[property=\"article:author\"]",
                "meta[name=\"author\"]",
            ]),
            supplies_selectors: strings(&[
                "section#supplies",
                "div.supplies-list",
                "div#supplies-list",
                "div.supplies",
                "ul.supplies",
            ]),
            supplies_keyword: "supplies".to_string(),
            supplies_heading_pattern:
                r"things\s+you['’]?ll\s+need|supplies|what\s+you\s+will\s+need|materials|tools\s+needed"
                    .to_string(),
            section_heading_pattern:
                r"things\s+you['’]?ll\s+need|supplies|what\s+you\s+will\s+need|materials|\bsteps?\b|instructions|directions"
                    .to_string(),
            content_root_selectors: strings(&[
                "div.main-content",
                "div.article-body",
                "article",
                "div#content",
                "div.steps",
            ]),
            step_container_selectors: strings(&[
                "div.step",
                "article.step",
                "section.step",
                "div.step-body",
                "div[data-step]",
                "li.step",
            ]),
            step_keyword: Some("step".to_string()),
            step_body_selectors: strings(&[
                "div.step-body",
                "div.step-text",
                "div.step-body-text",
                "div.caption",
                "p.step-body",
                "div.content",
            ]),
            step_headline_selectors: strings(&[
                ".step-title",
                "h1",
                "h2",
                "h3",
                "h4",
                "h5",
                "h6",
            ]),
            step_heading_tags: strings(&["h2", "h3", "h4"]),
            step_heading_pattern: r"^\s*step\s*\d+".to_string(),
            numbered_step_headers: false,
            paragraph_fallback: true,
            min_step_length: 15,
            min_paragraph_length: 10,
            min_container_text_length: 20,
            min_fallback_paragraph_length: 30,
            min_free_text_length: 30,
            exclusion_keywords: strings(&[
                "share", "like", "follow", "comment", "next", "previous", "step 1 of",
            ]),
            exclusion_window: 50,
            rejected_body_prefixes: strings(&["next", "previous", "share"]),
            fallback_exclusion_keywords: strings(&[
                "intro",
                "introduction",
                "overview",
                "summary",
                "conclusion",
                "thanks",
                "share",
                "like",
                "follow",
                "subscribe",
                "comment",
            ]),
            action_words: strings(&[
                "cut", "glue", "attach", "place", "install", "apply", "measure", "mark", "connect",
                "mount", "prepare", "build",
            ]),
            required_title_prefix: None,
            decorative_image_keywords: strings(&["icon", "logo", "avatar", "button"]),
            min_image_dimension: Some(50),
            image_source_attributes: strings(&[
                "src",
                "data-src",
                "data-lazy-src",
                "data-original",
                "data-url",
            ]),
        }
    }

    /// Instructables: one `div.step` section per step with a `step-body`.
    pub fn instructables() -> Self {
        Self {
            name: "instructables".to_string(),
            hosts: strings(&["instructables.com"]),
            title_selectors: strings(&[
                "h1.header-title",
                "h1",
                "meta[property=\"og:title\"]",
                "title",
            ]),
            ..Self::generic()
        }
    }

    /// DoItYourself: only "How to ..." articles, steps as numbered headings.
    pub fn doityourself() -> Self {
        Self {
            name: "doityourself".to_string(),
            hosts: strings(&["doityourself.com"]),
            title_selectors: strings(&[
                "h1.how-to__article-title",
                "h1",
                "meta[property=\"og:title\"]",
            ]),
            content_root_selectors: strings(&[
                "div.how-to__article-body",
                "div.article-body",
                "article",
            ]),
            step_heading_tags: strings(&["h2", "h3"]),
            numbered_step_headers: true,
            required_title_prefix: Some("how to".to_string()),
            ..Self::generic()
        }
    }

    /// Look up a built-in profile by name.
    pub fn preset(name: &str) -> Option<Self> {
        builtin_profiles().into_iter().find(|p| p.name == name)
    }

    /// True when `host` is one of this profile's hosts or a subdomain of one.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|h| {
            let h = h.to_ascii_lowercase();
            host == h || host.ends_with(&format!(".{h}"))
        })
    }

    /// Compile selectors and patterns once so extraction itself cannot fail
    /// on configuration.
    pub fn compile(&self) -> Result<CompiledProfile, ImportError> {
        let selectors = |list: &[String]| -> Result<Vec<NamedSelector>, ImportError> {
            list.iter()
                .map(|css| {
                    Selector::parse(css)
                        .map(|selector| NamedSelector {
                            css: css.clone(),
                            selector,
                        })
                        .map_err(|e| self.error(format!("selector '{css}': {e}")))
                })
                .collect()
        };

        let pattern = |source: &str| -> Result<Regex, ImportError> {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| self.error(format!("pattern '{source}': {e}")))
        };

        let fuzzy_steps = self.step_keyword.as_ref().map(|keyword| {
            ElementQuery::tags(&["div", "article", "section", "li"])
                .with(AttrPredicate::ClassContains(keyword.clone()))
                .with(AttrPredicate::IdContains(keyword.clone()))
                .with(AttrPredicate::HasAttr(format!("data-{keyword}")))
                .match_any()
        });

        let supplies_container = ElementQuery::tags(&["div", "section", "ul", "ol", "aside"])
            .with(AttrPredicate::ClassContains(self.supplies_keyword.clone()))
            .with(AttrPredicate::IdContains(self.supplies_keyword.clone()))
            .match_any();

        let heading_tags: Vec<&str> = self.step_heading_tags.iter().map(String::as_str).collect();

        Ok(CompiledProfile {
            title: selectors(&self.title_selectors)?,
            author: selectors(&self.author_selectors)?,
            supplies: selectors(&self.supplies_selectors)?,
            content_roots: selectors(&self.content_root_selectors)?,
            step_containers: selectors(&self.step_container_selectors)?,
            step_bodies: selectors(&self.step_body_selectors)?,
            step_headlines: selectors(&self.step_headline_selectors)?,
            supplies_heading: pattern(&self.supplies_heading_pattern)?,
            section_heading: pattern(&self.section_heading_pattern)?,
            step_heading: pattern(&self.step_heading_pattern)?,
            step_headings: ElementQuery::tags(&heading_tags),
            fuzzy_steps,
            supplies_container,
            profile: self.clone(),
        })
    }

    fn error(&self, message: String) -> ImportError {
        ImportError::ProfileError {
            profile: self.name.clone(),
            message,
        }
    }
}

/// All profiles that ship with the crate.
pub fn builtin_profiles() -> Vec<SiteProfile> {
    vec![
        SiteProfile::generic(),
        SiteProfile::instructables(),
        SiteProfile::doityourself(),
    ]
}

/// A CSS selector remembered together with its source text, for logging.
#[derive(Debug, Clone)]
pub struct NamedSelector {
    pub css: String,
    pub selector: Selector,
}

/// A `SiteProfile` with its selectors and patterns ready to run.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub profile: SiteProfile,
    pub title: Vec<NamedSelector>,
    pub author: Vec<NamedSelector>,
    pub supplies: Vec<NamedSelector>,
    pub content_roots: Vec<NamedSelector>,
    pub step_containers: Vec<NamedSelector>,
    pub step_bodies: Vec<NamedSelector>,
    pub step_headlines: Vec<NamedSelector>,
    pub supplies_heading: Regex,
    pub section_heading: Regex,
    pub step_heading: Regex,
    pub step_headings: ElementQuery,
    pub fuzzy_steps: Option<ElementQuery>,
    pub supplies_container: ElementQuery,
}

impl CompiledProfile {
    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_compile() {
        for profile in builtin_profiles() {
            assert!(profile.compile().is_ok(), "{} should compile", profile.name);
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(SiteProfile::preset("doityourself").unwrap().name, "doityourself");
        assert!(SiteProfile::preset("nope").is_none());
        assert_eq!(SiteProfile::default(), SiteProfile::generic());
    }

    #[test]
    fn test_matches_host() {
        let profile = SiteProfile::instructables();
        assert!(profile.matches_host("instructables.com"));
        assert!(profile.matches_host("www.Instructables.com"));
        assert!(!profile.matches_host("notinstructables.com"));
        assert!(!SiteProfile::generic().matches_host("example.com"));
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let profile = SiteProfile {
            name: "broken".to_string(),
            title_selectors: vec!["h1[".to_string()],
            ..SiteProfile::generic()
        };
        match profile.compile() {
            Err(ImportError::ProfileError { profile, message }) => {
                assert_eq!(profile, "broken");
                assert!(message.contains("h1["));
            }
            other => panic!("expected profile error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let profile = SiteProfile {
            step_heading_pattern: "step (".to_string(),
            ..SiteProfile::generic()
        };
        assert!(profile.compile().is_err());
    }

    #[test]
    fn test_partial_toml_profile_uses_defaults() {
        let profile: SiteProfile = toml_profile(
            r#"
            name = "shelfsite"
            hosts = ["shelves.example"]
            required_title_prefix = "How to"
            min_step_length = 40
            "#,
        );
        assert_eq!(profile.name, "shelfsite");
        assert_eq!(profile.min_step_length, 40);
        assert_eq!(profile.required_title_prefix.as_deref(), Some("How to"));
        assert_eq!(profile.title_selectors, SiteProfile::generic().title_selectors);
    }

    fn toml_profile(source: &str) -> SiteProfile {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
