pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod model;
pub mod persist;
pub mod pipelines;
pub mod profile;
pub mod tool_locator;
pub mod urls;

pub use config::AppConfig;
pub use error::{ImportError, RejectionReason, ValidationError};
pub use fetchers::{Fetcher, RequestFetcher};
pub use model::{GuideDraft, GuideRecord, StepEntry};
pub use pipelines::{extract, Pipeline};
pub use profile::SiteProfile;

use crate::config::FetchConfig;

/// Fetch a single URL with default fetch settings and extract a guide from it.
pub async fn import_guide(url: &str, profile: &SiteProfile) -> Result<GuideRecord, ImportError> {
    let fetcher = RequestFetcher::new(&FetchConfig::default())?;
    let pipeline = Pipeline::new(profile)?;
    pipelines::process(&fetcher, &pipeline, url).await
}
