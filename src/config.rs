use crate::error::ImportError;
use crate::profile::{builtin_profiles, SiteProfile};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Profile used when no configured host matches the URL
    #[serde(default = "default_profile")]
    pub default_profile: String,
    /// Site profiles by name; these shadow built-in presets of the same name
    #[serde(default)]
    pub profiles: HashMap<String, SiteProfile>,
    /// HTTP fetching behaviour
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Link discovery on category pages
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Where accepted guides are written
    #[serde(default)]
    pub output: OutputConfig,
    /// Vision model used to locate tools in images
    #[serde(default)]
    pub vision: VisionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_profile: default_profile(),
            profiles: HashMap::new(),
            fetch: FetchConfig::default(),
            discovery: DiscoveryConfig::default(),
            output: OutputConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Lower bound of the random delay before every request
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Upper bound of the random delay before every request
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// User agents rotated at random, one per request
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agents: default_user_agents(),
        }
    }
}

/// Configuration for link discovery
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Anchor text a guide link must contain (any case)
    #[serde(default = "default_keyword")]
    pub keyword: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
        }
    }
}

/// Configuration for persisted output
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Configuration for the vision tool locator
#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    /// API key (can also be set via GOOGLE_API_KEY)
    pub api_key: Option<String>,
    /// Model identifier
    #[serde(default = "default_vision_model")]
    pub model: String,
    /// Base URL for the API endpoint (for proxies and tests)
    pub base_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_vision_timeout")]
    pub timeout: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_vision_model(),
            base_url: None,
            timeout: default_vision_timeout(),
        }
    }
}

// Default value functions
fn default_profile() -> String {
    "generic".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ]
    .iter()
    .map(|ua| ua.to_string())
    .collect()
}

fn default_keyword() -> String {
    "how to".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("guides.json")
}

fn default_vision_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_vision_timeout() -> u64 {
    30
}

fn environment() -> Environment {
    Environment::with_prefix("HOWTO")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with HOWTO__ prefix
    /// 2. howto.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: HOWTO__FETCH__MIN_DELAY_MS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Parse configuration from TOML text alone, ignoring the environment.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Profile by name: configured profiles first, then built-in presets.
    pub fn profile(&self, name: &str) -> Result<SiteProfile, ImportError> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(SiteProfile {
                name: name.to_string(),
                ..profile.clone()
            });
        }
        SiteProfile::preset(name).ok_or_else(|| ImportError::UnknownProfile(name.to_string()))
    }

    /// Every known profile: configured ones (sorted by name), then the
    /// built-in presets they do not shadow.
    pub fn site_profiles(&self) -> Vec<SiteProfile> {
        let mut names: Vec<&String> = self.profiles.keys().collect();
        names.sort();

        let mut profiles: Vec<SiteProfile> = names
            .into_iter()
            .filter_map(|name| self.profile(name).ok())
            .collect();
        for preset in builtin_profiles() {
            if !profiles.iter().any(|p| p.name == preset.name) {
                profiles.push(preset);
            }
        }
        profiles
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the source priority.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("howto").required(false))
        // Use double underscore for nested: HOWTO__PROFILES__MYSITE__MIN_STEP_LENGTH
        .add_source(environment())
        .build()?;

    settings.try_deserialize()
}
