use super::Fetcher;
use crate::config::FetchConfig;
use crate::error::ImportError;
use async_trait::async_trait;
use log::{debug, error};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (compatible; HowtoImport/1.0)";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Plain HTTP GET with a random politeness delay and user-agent rotation.
/// Never retries.
pub struct RequestFetcher {
    client: Client,
    user_agents: Vec<String>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl RequestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            min_delay_ms: config.min_delay_ms.min(config.max_delay_ms),
            max_delay_ms: config.min_delay_ms.max(config.max_delay_ms),
        })
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENT)
    }

    fn pick_delay(&self) -> Duration {
        let millis = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(millis)
    }

    async fn get(&self, url: &str, user_agent: &str) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .send()
            .await?
            .error_for_status()?;
        response.text().await
    }
}

#[async_trait]
impl Fetcher for RequestFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let delay = self.pick_delay();
        if !delay.is_zero() {
            debug!("Waiting {:?} before fetching {}", delay, url);
            tokio::time::sleep(delay).await;
        }

        let user_agent = self.pick_user_agent().to_string();
        match self.get(url, &user_agent).await {
            Ok(html) => {
                debug!("Fetched {} ({} bytes)", url, html.len());
                Some(html)
            }
            Err(e) => {
                error!("Error fetching {}: {}", url, e);
                None
            }
        }
    }
}
