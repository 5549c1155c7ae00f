use crate::document::Document;
use crate::error::{ImportError, RejectionReason, ValidationError};
use crate::extractors::{
    extract_author, extract_free_text, extract_steps, extract_supplies, extract_title,
    scan_images, ExtractionContext,
};
use crate::model::{title_has_prefix, GuideDraft, GuideRecord, ValidationRules, UNKNOWN_AUTHOR};
use crate::profile::{CompiledProfile, SiteProfile};
use crate::urls::parse_base;
use log::{debug, info, warn};

/// Extraction pipeline bound to one compiled site profile.
///
/// Holds only compiled selectors and patterns, so a single pipeline can be
/// shared between threads and reused for any number of documents.
#[derive(Debug, Clone)]
pub struct Pipeline {
    profile: CompiledProfile,
}

impl Pipeline {
    pub fn new(profile: &SiteProfile) -> Result<Self, ImportError> {
        Ok(Self {
            profile: profile.compile()?,
        })
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile.profile
    }

    /// Turn one HTML document into a guide record, or explain why not.
    pub fn extract(&self, html: &str, base_url: &str) -> Result<GuideRecord, RejectionReason> {
        let result = self.run(html, base_url);
        match &result {
            Ok(record) => info!(
                "Accepted '{}' from {} ({} steps, {} images)",
                record.title(),
                base_url,
                record.steps().len(),
                record.images().len()
            ),
            Err(reason) => warn!("Rejected {}: {}", base_url, reason),
        }
        result
    }

    fn run(&self, html: &str, base_url: &str) -> Result<GuideRecord, RejectionReason> {
        if html.trim().is_empty() {
            return Err(RejectionReason::ParseFailure("empty document".to_string()));
        }
        let base = parse_base(base_url)
            .ok_or_else(|| RejectionReason::ParseFailure(format!("invalid base URL '{base_url}'")))?;

        let document = Document::parse(html);
        let ctx = ExtractionContext {
            document: &document,
            base_url: Some(&base),
            profile: &self.profile,
        };
        let settings = ctx.settings();

        let title = extract_title(&ctx).ok_or(RejectionReason::NoTitle)?;
        if let Some(prefix) = &settings.required_title_prefix {
            if !title_has_prefix(&title.text, prefix) {
                return Err(RejectionReason::TitleFilterMismatch {
                    title: title.text,
                    prefix: prefix.clone(),
                });
            }
        }

        let author = extract_author(&ctx);
        let supplies = extract_supplies(&ctx);

        let scan = extract_steps(&ctx);
        debug!("Step segmentation: {:?}", scan.mode);
        let images = if scan.images.is_empty() {
            scan_images(&ctx)
        } else {
            scan.images
        };

        let anchor = author
            .as_ref()
            .filter(|m| m.in_body())
            .or(Some(&title).filter(|m| m.in_body()))
            .map(|m| m.element);
        let free_text = extract_free_text(&ctx, anchor);

        if scan.steps.is_empty() && images.is_empty() {
            return Err(RejectionReason::NoStepsNoImages);
        }

        let draft = GuideDraft {
            title: title.text,
            author: author.map_or_else(|| UNKNOWN_AUTHOR.to_string(), |m| m.text),
            supplies,
            steps: scan.steps,
            images,
            free_text,
            source_url: base_url.to_string(),
        };
        let rules = ValidationRules {
            required_title_prefix: settings.required_title_prefix.clone(),
            min_step_length: settings.min_step_length,
        };
        draft.validate(&rules).map_err(rejection_for)
    }
}

fn rejection_for(error: ValidationError) -> RejectionReason {
    match error {
        ValidationError::EmptyTitle => RejectionReason::NoTitle,
        ValidationError::TitlePrefix { title, prefix } => {
            RejectionReason::TitleFilterMismatch { title, prefix }
        }
        ValidationError::NoContent => RejectionReason::NoStepsNoImages,
        other => RejectionReason::ParseFailure(other.to_string()),
    }
}

/// One-shot extraction with an uncompiled profile.
pub fn extract(
    html: &str,
    base_url: &str,
    profile: &SiteProfile,
) -> Result<GuideRecord, RejectionReason> {
    let pipeline =
        Pipeline::new(profile).map_err(|e| RejectionReason::InvalidProfile(e.to_string()))?;
    pipeline.extract(html, base_url)
}
