use super::ExtractionContext;
use crate::document::{collect_images, ImageNode};
use crate::profile::SiteProfile;
use crate::urls::resolve_url;
use log::debug;
use scraper::ElementRef;
use std::collections::HashSet;
use url::Url;

/// Accumulates unique, absolute, non-decorative image URLs in the order
/// they are first seen.
pub struct ImageCollector<'a> {
    profile: &'a SiteProfile,
    base_url: Option<&'a Url>,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl<'a> ImageCollector<'a> {
    pub fn new(ctx: &ExtractionContext<'a>) -> Self {
        Self {
            profile: ctx.settings(),
            base_url: ctx.base_url,
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    /// Add every acceptable image at or below `scope`; returns how many were
    /// new.
    pub fn collect_from(&mut self, scope: ElementRef<'_>) -> usize {
        let before = self.urls.len();
        for image in collect_images(scope, &self.profile.image_source_attributes) {
            if let Some(url) = self.accept(&image) {
                if self.seen.insert(url.clone()) {
                    self.urls.push(url);
                }
            }
        }
        self.urls.len() - before
    }

    fn accept(&self, image: &ImageNode) -> Option<String> {
        if is_decorative(image, &self.profile.decorative_image_keywords) {
            debug!("Skipping decorative image {:?}", image.source);
            return None;
        }

        let url = resolve_url(image.source.as_deref()?, self.base_url)?;

        if let (Some(min), Some((width, height))) =
            (self.profile.min_image_dimension, image.dimensions())
        {
            if width < min || height < min {
                debug!("Skipping {}x{} image {}", width, height, url);
                return None;
            }
        }
        Some(url)
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Class or alt text names a decorative role (icon, logo, ...).
pub fn is_decorative(image: &ImageNode, keywords: &[String]) -> bool {
    let class = image.class.to_lowercase();
    let alt = image.alt.to_lowercase();
    keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        class.contains(&keyword) || alt.contains(&keyword)
    })
}

/// Last-resort image scan over the content area when the steps yielded no
/// images.
pub fn scan_images(ctx: &ExtractionContext<'_>) -> Vec<String> {
    let mut collector = ImageCollector::new(ctx);
    let found = collector.collect_from(ctx.content_root());
    debug!("Body-level image scan found {} images", found);
    collector.into_urls()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::profile::SiteProfile;

    fn scan(html: &str) -> Vec<String> {
        let document = Document::parse(html);
        let profile = SiteProfile::generic().compile().unwrap();
        let base = Url::parse("https://x.com/guide").unwrap();
        let ctx = ExtractionContext {
            document: &document,
            base_url: Some(&base),
            profile: &profile,
        };
        scan_images(&ctx)
    }

    #[test]
    fn test_decorative_images_are_skipped() {
        let images = scan(
            r#"<img src="/a.png" class="site-logo"><img src="/b.png" alt="Share button">
               <img src="/c.png" class="Icon-small"><img src="/photo.jpg" alt="finished shelf">"#,
        );
        assert_eq!(images, vec!["https://x.com/photo.jpg"]);
    }

    #[test]
    fn test_duplicates_collapse_after_resolution() {
        let images = scan(
            r#"<img src="/img/a.png"><img src="https://x.com/img/a.png"><img data-src="/img/b.png">"#,
        );
        assert_eq!(images, vec!["https://x.com/img/a.png", "https://x.com/img/b.png"]);
    }

    #[test]
    fn test_small_declared_dimensions_are_skipped() {
        let images = scan(
            r#"<img src="/tiny.gif" width="16" height="16">
               <img src="/unparsed.jpg" width="auto" height="20">
               <img src="/big.jpg" width="800" height="600">"#,
        );
        assert_eq!(images, vec!["https://x.com/unparsed.jpg", "https://x.com/big.jpg"]);
    }

    #[test]
    fn test_non_web_sources_are_skipped() {
        let images = scan(r#"<img src="data:image/gif;base64,R0lGOD"><img src="javascript:alert(1)">"#);
        assert!(images.is_empty());
    }
}
