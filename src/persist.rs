//! Writing accepted guides as canonical JSON.

use crate::error::ImportError;
use crate::model::GuideRecord;
use log::info;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::Path;

/// Serialize with four-space indentation, keeping non-ASCII text as is.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ImportError> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Canonical JSON text of one record.
pub fn to_json(record: &GuideRecord) -> Result<String, ImportError> {
    to_pretty_json(record)
}

/// Canonical JSON array of records, as written by [`save_guides`].
pub fn render_guides(records: &[GuideRecord]) -> Result<String, ImportError> {
    to_pretty_json(records)
}

pub async fn save_guides(path: impl AsRef<Path>, records: &[GuideRecord]) -> Result<(), ImportError> {
    let path = path.as_ref();
    let json = render_guides(records)?;
    tokio::fs::write(path, json).await?;
    info!("Saved {} guides to {}", records.len(), path.display());
    Ok(())
}

/// Read a file written by [`save_guides`]; every record is validated again.
pub async fn load_guides(path: impl AsRef<Path>) -> Result<Vec<GuideRecord>, ImportError> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GuideDraft, StepEntry, ValidationRules};

    fn record(title: &str) -> GuideRecord {
        GuideDraft {
            title: title.to_string(),
            author: "Zoë".to_string(),
            steps: vec![StepEntry {
                headline: None,
                body: "Sand the surface before painting.".to_string(),
            }],
            source_url: "https://x.com/a".to_string(),
            ..GuideDraft::default()
        }
        .validate(&ValidationRules::default())
        .unwrap()
    }

    #[test]
    fn test_four_space_indent_and_unicode() {
        let json = to_json(&record("How to Sand")).unwrap();
        assert!(json.starts_with("{\n    \"title\": \"How to Sand\""));
        assert!(json.contains("\"author\": \"Zoë\""));
        assert!(json.contains("\"freeText\": \"\""));
    }

    #[test]
    fn test_render_is_deterministic() {
        let records = vec![record("One"), record("Two")];
        assert_eq!(render_guides(&records).unwrap(), render_guides(&records).unwrap());
        assert!(render_guides(&[]).unwrap() == "[]");
    }
}
