use crate::error::ValidationError;
use crate::urls::is_absolute_web_url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// One instruction step of a guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub headline: Option<String>,
    pub body: String,
}

/// A validated how-to guide.
///
/// Only obtainable through [`GuideDraft::validate`] (or deserialization,
/// which validates too), so every value upholds the record invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GuideDraft")]
pub struct GuideRecord {
    title: String,
    author: String,
    supplies: Vec<String>,
    steps: Vec<StepEntry>,
    images: Vec<String>,
    free_text: String,
    source_url: String,
}

impl GuideRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn supplies(&self) -> &[String] {
        &self.supplies
    }

    pub fn steps(&self) -> &[StepEntry] {
        &self.steps
    }

    /// Unique absolute image URLs in first-seen document order.
    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Unvalidated guide data as assembled by the extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuideDraft {
    pub title: String,
    pub author: String,
    pub supplies: Vec<String>,
    pub steps: Vec<StepEntry>,
    pub images: Vec<String>,
    pub free_text: String,
    pub source_url: String,
}

/// Profile-dependent parts of the record schema.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub required_title_prefix: Option<String>,
    /// Step bodies must be strictly longer than this
    pub min_step_length: usize,
}

/// Case-insensitive "starts with", ignoring surrounding whitespace.
pub fn title_has_prefix(title: &str, prefix: &str) -> bool {
    title
        .trim()
        .to_lowercase()
        .starts_with(&prefix.trim().to_lowercase())
}

impl GuideDraft {
    /// Check every record invariant and seal the draft.
    ///
    /// Checks run in a fixed order so a draft with several problems always
    /// reports the same one.
    pub fn validate(self, rules: &ValidationRules) -> Result<GuideRecord, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(prefix) = &rules.required_title_prefix {
            if !title_has_prefix(title, prefix) {
                return Err(ValidationError::TitlePrefix {
                    title: title.to_string(),
                    prefix: prefix.clone(),
                });
            }
        }

        if self.steps.is_empty() && self.images.is_empty() {
            return Err(ValidationError::NoContent);
        }

        if let Some(index) = self
            .supplies
            .iter()
            .position(|s| s.is_empty() || s.trim() != s)
        {
            return Err(ValidationError::InvalidSupply(index));
        }

        for (index, step) in self.steps.iter().enumerate() {
            let len = step.body.chars().count();
            if len == 0 || len <= rules.min_step_length {
                return Err(ValidationError::StepTooShort {
                    index,
                    len,
                    min: rules.min_step_length,
                });
            }
        }

        let mut seen = HashSet::new();
        for image in &self.images {
            if !is_absolute_web_url(image) {
                return Err(ValidationError::InvalidImage(image.clone()));
            }
            if !seen.insert(image.as_str()) {
                return Err(ValidationError::DuplicateImage(image.clone()));
            }
        }

        Ok(GuideRecord {
            title: title.to_string(),
            author: self.author,
            supplies: self.supplies,
            steps: self.steps,
            images: self.images,
            free_text: self.free_text,
            source_url: self.source_url,
        })
    }
}

impl TryFrom<GuideDraft> for GuideRecord {
    type Error = ValidationError;

    fn try_from(draft: GuideDraft) -> Result<Self, Self::Error> {
        draft.validate(&ValidationRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> GuideDraft {
        GuideDraft {
            title: "How to Build a Shelf".to_string(),
            author: "Ann".to_string(),
            supplies: vec!["Plywood".to_string(), "Screws".to_string()],
            steps: vec![StepEntry {
                headline: Some("Step 1".to_string()),
                body: "Cut the plywood to the marked length.".to_string(),
            }],
            images: vec!["https://x.com/a.jpg".to_string()],
            free_text: String::new(),
            source_url: "https://x.com/shelf".to_string(),
        }
    }

    fn rules(prefix: Option<&str>) -> ValidationRules {
        ValidationRules {
            required_title_prefix: prefix.map(str::to_string),
            min_step_length: 15,
        }
    }

    #[test]
    fn test_valid_draft() {
        let record = draft().validate(&rules(Some("HOW TO"))).unwrap();
        assert_eq!(record.title(), "How to Build a Shelf");
        assert_eq!(record.supplies().len(), 2);
        assert_eq!(record.images(), ["https://x.com/a.jpg"]);
    }

    #[test]
    fn test_title_rules() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert_eq!(d.validate(&rules(None)), Err(ValidationError::EmptyTitle));

        let mut d = draft();
        d.title = "Building a Shelf".to_string();
        assert!(matches!(
            d.validate(&rules(Some("how to"))),
            Err(ValidationError::TitlePrefix { .. })
        ));
    }

    #[test]
    fn test_images_alone_are_enough_content() {
        let mut d = draft();
        d.steps.clear();
        assert!(d.clone().validate(&rules(None)).is_ok());
        d.images.clear();
        assert_eq!(d.validate(&rules(None)), Err(ValidationError::NoContent));
    }

    #[test]
    fn test_step_body_length_is_strict() {
        let mut d = draft();
        d.steps[0].body = "x".repeat(15);
        assert!(matches!(
            d.validate(&rules(None)),
            Err(ValidationError::StepTooShort { index: 0, len: 15, min: 15 })
        ));
    }

    #[test]
    fn test_image_rules() {
        let mut d = draft();
        d.images.push("/relative.jpg".to_string());
        assert!(matches!(d.validate(&rules(None)), Err(ValidationError::InvalidImage(_))));

        let mut d = draft();
        d.images.push("https://x.com/a.jpg".to_string());
        assert!(matches!(d.validate(&rules(None)), Err(ValidationError::DuplicateImage(_))));
    }

    #[test]
    fn test_untrimmed_supply_is_rejected() {
        let mut d = draft();
        d.supplies.push(" Glue".to_string());
        assert_eq!(d.validate(&rules(None)), Err(ValidationError::InvalidSupply(2)));
    }

    #[test]
    fn test_json_shape() {
        let record = draft().validate(&rules(None)).unwrap();
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["title", "author", "supplies", "steps", "images", "freeText", "sourceUrl"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(json["steps"][0]["headline"], "Step 1");
    }

    #[test]
    fn test_deserialization_validates() {
        let record = draft().validate(&rules(None)).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: GuideRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);

        let invalid = r#"{"title": "", "steps": [], "images": []}"#;
        assert!(serde_json::from_str::<GuideRecord>(invalid).is_err());
    }
}
