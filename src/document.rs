//! Read-only views over a parsed HTML tree.
//!
//! Everything here degrades to `None` or an empty collection when the
//! markup does not have the expected shape; html5ever already recovers from
//! malformed input, so parsing itself cannot fail.

use ego_tree::iter::Edge;
use html_escape::decode_html_entities;
use regex::Regex;
use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use std::sync::LazyLock;

static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Elements whose text never belongs to the readable content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Elements that imply a word boundary around their text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// The `<body>` element, or the root when the parser produced none.
    pub fn body(&self) -> ElementRef<'_> {
        self.html
            .select(&BODY_SELECTOR)
            .next()
            .unwrap_or_else(|| self.root())
    }

    pub fn find_first(&self, query: &ElementQuery) -> Option<ElementRef<'_>> {
        find_first_in(self.root(), query)
    }

    pub fn find_all(&self, query: &ElementQuery) -> Vec<ElementRef<'_>> {
        find_all_in(self.root(), query)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }

    /// Try each selector of `family` in order and return the index of the
    /// first one that matches anything, together with its matches.
    pub fn select_family<'s>(
        &self,
        family: impl IntoIterator<Item = &'s Selector>,
    ) -> Option<(usize, Vec<ElementRef<'_>>)> {
        family.into_iter().enumerate().find_map(|(i, selector)| {
            let found = self.select_all(selector);
            (!found.is_empty()).then_some((i, found))
        })
    }
}

/// Attribute test applied to a candidate element. Substring tests ignore
/// case.
#[derive(Debug, Clone)]
pub enum AttrPredicate {
    /// Exact class name, ASCII case-insensitive.
    HasClass(String),
    ClassContains(String),
    IdContains(String),
    /// Attribute present, whatever its value.
    HasAttr(String),
    /// Attribute present and its value matches the pattern.
    AttrMatches(String, Regex),
}

impl AttrPredicate {
    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        match self {
            AttrPredicate::HasClass(name) => {
                value.has_class(name, CaseSensitivity::AsciiCaseInsensitive)
            }
            AttrPredicate::ClassContains(needle) => {
                let needle = needle.to_lowercase();
                value.classes().any(|c| c.to_lowercase().contains(&needle))
            }
            AttrPredicate::IdContains(needle) => value
                .id()
                .is_some_and(|id| id.to_lowercase().contains(&needle.to_lowercase())),
            AttrPredicate::HasAttr(name) => value.attr(name).is_some(),
            AttrPredicate::AttrMatches(name, pattern) => {
                value.attr(name).is_some_and(|v| pattern.is_match(v))
            }
        }
    }
}

/// Tag-name plus attribute-predicate query, the non-CSS half of the
/// document query surface.
#[derive(Debug, Clone, Default)]
pub struct ElementQuery {
    tags: Vec<String>,
    predicates: Vec<AttrPredicate>,
    any: bool,
}

impl ElementQuery {
    /// Match elements with one of the given tag names.
    pub fn tags(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            ..Self::default()
        }
    }

    pub fn with(mut self, predicate: AttrPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Require only one predicate to hold instead of all of them.
    pub fn match_any(mut self) -> Self {
        self.any = true;
        self
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let name = element.value().name();
        if !self.tags.is_empty() && !self.tags.iter().any(|t| t == name) {
            return false;
        }
        if self.predicates.is_empty() {
            return true;
        }
        if self.any {
            self.predicates.iter().any(|p| p.matches(element))
        } else {
            self.predicates.iter().all(|p| p.matches(element))
        }
    }
}

pub fn find_first_in<'a>(scope: ElementRef<'a>, query: &ElementQuery) -> Option<ElementRef<'a>> {
    descendant_elements(scope).find(|el| query.matches(el))
}

pub fn find_all_in<'a>(scope: ElementRef<'a>, query: &ElementQuery) -> Vec<ElementRef<'a>> {
    descendant_elements(scope)
        .filter(|el| query.matches(el))
        .collect()
}

/// Descendants of `scope` in document order, excluding `scope` itself.
pub fn descendant_elements<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Readable text of an element, whitespace-normalized.
///
/// `<meta>` elements contribute their `content` attribute instead.
pub fn element_text(element: ElementRef<'_>) -> String {
    if element.value().name() == "meta" {
        return element
            .value()
            .attr("content")
            .map(|content| normalize_whitespace(&decode_html_entities(content)))
            .unwrap_or_default();
    }

    let mut raw = String::new();
    push_text(element, &mut raw);
    normalize_whitespace(&raw)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    // Iterative walk: hostile markup can nest deeper than the call stack.
    let mut skipped_depth = 0usize;
    for edge in element.traverse().skip(1) {
        match edge {
            Edge::Open(node) => {
                if let Some(child) = node.value().as_element() {
                    if skipped_depth > 0 || SKIPPED_TAGS.contains(&child.name()) {
                        skipped_depth += 1;
                    } else if BLOCK_TAGS.contains(&child.name()) {
                        out.push(' ');
                    }
                } else if let Some(text) = node.value().as_text() {
                    if skipped_depth == 0 {
                        out.push_str(text);
                    }
                }
            }
            Edge::Close(node) => {
                if let Some(child) = node.value().as_element() {
                    if skipped_depth > 0 {
                        skipped_depth -= 1;
                    } else if BLOCK_TAGS.contains(&child.name()) {
                        out.push(' ');
                    }
                }
            }
        }
    }
}

/// `Some(1..=6)` for `h1`..`h6`.
pub fn heading_level(element: &ElementRef<'_>) -> Option<u8> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// A node met while scanning forward through siblings.
#[derive(Debug, Clone)]
pub enum ForwardNode<'a> {
    Element(ElementRef<'a>),
    /// Bare text between elements, whitespace-normalized and non-empty.
    Text(String),
}

/// Siblings after `start`, taken until `stop` returns true for an element.
/// The stopping element is not included.
pub fn following_siblings<'a>(
    start: ElementRef<'a>,
    mut stop: impl FnMut(&ElementRef<'a>) -> bool,
) -> Vec<ForwardNode<'a>> {
    let mut nodes = Vec::new();
    for sibling in start.next_siblings() {
        if let Some(element) = ElementRef::wrap(sibling) {
            if stop(&element) {
                break;
            }
            nodes.push(ForwardNode::Element(element));
        } else if let Some(text) = sibling.value().as_text() {
            let text = normalize_whitespace(text);
            if !text.is_empty() {
                nodes.push(ForwardNode::Text(text));
            }
        }
    }
    nodes
}

/// Elements after `start` in document order without descending: its next
/// siblings, then the next siblings of its parent, and so on up the tree.
pub fn forward_elements<'a>(start: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    std::iter::successors(Some(*start), |node| node.parent())
        .flat_map(|node| node.next_siblings())
        .filter_map(ElementRef::wrap)
}

/// An `<img>` element reduced to the attributes the image filters look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    /// First non-empty, non-`data:` source attribute, in the caller's
    /// priority order.
    pub source: Option<String>,
    pub class: String,
    pub alt: String,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl ImageNode {
    fn from_element(element: ElementRef<'_>, source_attrs: &[String]) -> Self {
        let value = element.value();
        let attr = |name: &str| {
            value
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            source: source_attrs
                .iter()
                .find_map(|name| attr(name.as_str()).filter(|v| !v.starts_with("data:"))),
            class: value.classes().collect::<Vec<_>>().join(" "),
            alt: value.attr("alt").unwrap_or_default().to_string(),
            width: attr("width").or_else(|| attr("data-width")),
            height: attr("height").or_else(|| attr("data-height")),
        }
    }

    /// Declared pixel dimensions, when both parse as integers.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let parse = |v: &Option<String>| v.as_deref().and_then(|v| v.trim_end_matches("px").parse::<u32>().ok());
        Some((parse(&self.width)?, parse(&self.height)?))
    }
}

/// Every image at or below `scope`, in document order.
pub fn collect_images(scope: ElementRef<'_>, source_attrs: &[String]) -> Vec<ImageNode> {
    let own = (scope.value().name() == "img").then_some(scope);
    own.into_iter()
        .chain(scope.select(&IMG_SELECTOR))
        .map(|img| ImageNode::from_element(img, source_attrs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Vec<String> {
        ["src", "data-src", "data-lazy-src", "data-original", "data-url"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Document::parse("<div id='x'>  Hello\n\n <b>bold</b>   world <script>var a;</script></div>");
        let el = doc.select_first(&Selector::parse("#x").unwrap()).unwrap();
        assert_eq!(element_text(el), "Hello bold world");
    }

    #[test]
    fn test_element_text_separates_blocks() {
        let doc = Document::parse("<ul id='l'><li>Saw</li><li>Glue</li></ul>");
        let el = doc.select_first(&Selector::parse("#l").unwrap()).unwrap();
        assert_eq!(element_text(el), "Saw Glue");
    }

    #[test]
    fn test_element_text_skips_nested_hidden_subtrees() {
        let doc = Document::parse("<div id='x'>left <svg><g><text>icon</text></g></svg>right<p>para</p></div>");
        let el = doc.select_first(&Selector::parse("#x").unwrap()).unwrap();
        assert_eq!(element_text(el), "left right para");
    }

    #[test]
    fn test_meta_text_uses_content() {
        let doc = Document::parse(
            r#"<html><head><meta property="og:title" content="Tom &amp;amp; Jerry"></head></html>"#,
        );
        let el = doc
            .select_first(&Selector::parse("meta[property='og:title']").unwrap())
            .unwrap();
        assert_eq!(element_text(el), "Tom & Jerry");
    }

    #[test]
    fn test_query_by_class_fragment_and_id() {
        let doc = Document::parse(
            r#"<div class="Guide-Step-Item">a</div><section id="step-2">b</section><div class="other">c</div>"#,
        );
        let query = ElementQuery::tags(&["div", "section"])
            .with(AttrPredicate::ClassContains("step".into()))
            .with(AttrPredicate::IdContains("step".into()))
            .match_any();
        let found = doc.find_all(&query);
        assert_eq!(found.len(), 2);
        assert_eq!(element_text(found[1]), "b");
    }

    #[test]
    fn test_query_by_exact_class_and_attributes() {
        let doc = Document::parse(
            r#"<li class="Step">a</li><li class="steps">b</li>
               <li data-step="3">c</li><li data-kind="tip-2">d</li><li data-kind="note">e</li>"#,
        );
        let texts = |query: ElementQuery| -> Vec<String> {
            doc.find_all(&query).into_iter().map(element_text).collect()
        };

        assert_eq!(texts(ElementQuery::tags(&["li"]).with(AttrPredicate::HasClass("step".into()))), ["a"]);
        assert_eq!(texts(ElementQuery::tags(&["li"]).with(AttrPredicate::HasAttr("data-step".into()))), ["c"]);
        let tips = AttrPredicate::AttrMatches("data-kind".into(), Regex::new(r"^tip-\d+$").unwrap());
        assert_eq!(texts(ElementQuery::tags(&["li"]).with(tips)), ["d"]);
    }

    #[test]
    fn test_select_family_returns_first_matching_selector() {
        let doc = Document::parse(r#"<div class="b">1</div><div class="b">2</div><div class="c">3</div>"#);
        let family = vec![
            Selector::parse(".a").unwrap(),
            Selector::parse(".b").unwrap(),
            Selector::parse(".c").unwrap(),
        ];
        let (index, found) = doc.select_family(&family).unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.len(), 2);
        assert!(doc.select_family(&family[..1]).is_none());
    }

    #[test]
    fn test_following_siblings_stops_before_predicate() {
        let doc = Document::parse("<div><h2>Step 1</h2>loose text<p>one</p><h3>sub</h3><h2>Step 2</h2><p>two</p></div>");
        let h2 = doc.select_first(&Selector::parse("h2").unwrap()).unwrap();
        let nodes = following_siblings(h2, |el| heading_level(el).is_some_and(|l| l <= 2));
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], ForwardNode::Text(t) if t == "loose text"));
    }

    #[test]
    fn test_forward_elements_climbs_out_of_parent() {
        let doc = Document::parse(
            "<div><p class='byline'><a id='author'>Ann</a></p><p>after byline</p></div><p>outside</p>",
        );
        let author = doc.select_first(&Selector::parse("#author").unwrap()).unwrap();
        let texts: Vec<String> = forward_elements(author).map(element_text).collect();
        assert_eq!(texts, vec!["after byline", "outside"]);
    }

    #[test]
    fn test_collect_images_uses_lazy_load_priority() {
        let doc = Document::parse(
            r#"<div id="s">
                <img src="" data-src="/lazy.jpg" class="photo main" alt="Shelf" width="640" height="480">
                <img src="data:image/gif;base64,R0lGOD" data-original="/orig.jpg">
                <img alt="nothing">
            </div>"#,
        );
        let scope = doc.select_first(&Selector::parse("#s").unwrap()).unwrap();
        let images = collect_images(scope, &attrs());
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].source.as_deref(), Some("/lazy.jpg"));
        assert_eq!(images[0].class, "photo main");
        assert_eq!(images[0].dimensions(), Some((640, 480)));
        assert_eq!(images[1].source.as_deref(), Some("/orig.jpg"));
        assert_eq!(images[1].dimensions(), None);
        assert_eq!(images[2].source, None);
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let doc = Document::parse("<div><p>unclosed <b>tags <img src=x.png</div></span>");
        assert!(!element_text(doc.body()).is_empty());
        assert!(doc.find_first(&ElementQuery::tags(&["table"])).is_none());
    }
}
