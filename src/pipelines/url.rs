use super::html::Pipeline;
use crate::error::{ImportError, RejectionReason};
use crate::fetchers::Fetcher;
use crate::model::GuideRecord;
use crate::profile::SiteProfile;
use log::{error, info, warn};
use url::Url;

/// Pipelines for several site profiles, picked per URL by host.
pub struct PipelineSet {
    default: Pipeline,
    by_host: Vec<Pipeline>,
}

impl PipelineSet {
    /// Every URL goes through the same profile.
    pub fn single(profile: &SiteProfile) -> Result<Self, ImportError> {
        Ok(Self {
            default: Pipeline::new(profile)?,
            by_host: Vec::new(),
        })
    }

    /// Host-specific profiles (those with a non-empty host list) in order,
    /// `default` for everything else.
    pub fn new(default: &SiteProfile, profiles: &[SiteProfile]) -> Result<Self, ImportError> {
        let by_host = profiles
            .iter()
            .filter(|p| !p.hosts.is_empty())
            .map(Pipeline::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            default: Pipeline::new(default)?,
            by_host,
        })
    }

    pub fn for_url(&self, url: &str) -> &Pipeline {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        host.and_then(|host| {
            self.by_host
                .iter()
                .find(|pipeline| pipeline.profile().matches_host(&host))
        })
        .unwrap_or(&self.default)
    }
}

/// Fetch one URL and extract a guide from it
///
/// # Returns
/// * `Ok(GuideRecord)` - The validated guide
/// * `Err(ImportError::FetchFailed)` - If the fetcher returned nothing
/// * `Err(ImportError::Rejected)` - If the document yielded no guide
pub async fn process(
    fetcher: &dyn Fetcher,
    pipeline: &Pipeline,
    url: &str,
) -> Result<GuideRecord, ImportError> {
    let html = fetcher
        .fetch(url)
        .await
        .ok_or_else(|| ImportError::FetchFailed(url.to_string()))?;
    Ok(pipeline.extract(&html, url)?)
}

/// Outcome of a batch import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: Vec<GuideRecord>,
    pub rejected: Vec<(String, RejectionReason)>,
    pub failed: Vec<String>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len() + self.failed.len()
    }
}

/// Process `urls` one after another, so the fetcher's politeness delay
/// applies between requests.
pub async fn process_all<I, S>(fetcher: &dyn Fetcher, pipelines: &PipelineSet, urls: I) -> ImportReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ImportReport::default();
    for url in urls {
        let url = url.as_ref();
        let pipeline = pipelines.for_url(url);
        info!("Processing {} with profile {}", url, pipeline.profile().name);

        match process(fetcher, pipeline, url).await {
            Ok(record) => report.accepted.push(record),
            Err(ImportError::Rejected(reason)) => report.rejected.push((url.to_string(), reason)),
            Err(e) => {
                error!("{}", e);
                report.failed.push(url.to_string());
            }
        }
    }

    if !report.failed.is_empty() {
        warn!("{} of {} URLs could not be fetched", report.failed.len(), report.total());
    }
    info!(
        "Imported {} of {} guides ({} rejected)",
        report.accepted.len(),
        report.total(),
        report.rejected.len()
    );
    report
}
