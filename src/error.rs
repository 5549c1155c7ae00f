use thiserror::Error;

/// Errors that can occur outside of the extraction core: fetching,
/// persisting, configuration and profile compilation.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Failed to talk to a remote server
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Failed to serialize or parse JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to read or write a file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// A site profile carries a selector or pattern that does not compile
    #[error("Invalid site profile '{profile}': {message}")]
    ProfileError { profile: String, message: String },

    /// No profile with the requested name is configured or built in
    #[error("Unknown site profile: {0}")]
    UnknownProfile(String),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),

    /// The fetcher returned no document for this URL
    #[error("Could not fetch {0}")]
    FetchFailed(String),

    /// The document was fetched but yielded no guide
    #[error("Document rejected: {0}")]
    Rejected(#[from] RejectionReason),
}

/// Why a document could not produce a guide record.
///
/// Rejections are an ordinary outcome of extraction, not a failure of the
/// program; callers are expected to match on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("no title could be extracted")]
    NoTitle,

    #[error("title '{title}' does not start with required prefix '{prefix}'")]
    TitleFilterMismatch { title: String, prefix: String },

    #[error("document has neither steps nor images")]
    NoStepsNoImages,

    #[error("document could not be processed: {0}")]
    ParseFailure(String),

    #[error("site profile is invalid: {0}")]
    InvalidProfile(String),
}

/// Schema violations found while turning a draft into a `GuideRecord`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title is empty")]
    EmptyTitle,

    #[error("title '{title}' does not start with '{prefix}'")]
    TitlePrefix { title: String, prefix: String },

    #[error("record has neither steps nor images")]
    NoContent,

    #[error("supply entry {0} is empty or untrimmed")]
    InvalidSupply(usize),

    #[error("step {index} body is too short ({len} <= {min} characters)")]
    StepTooShort { index: usize, len: usize, min: usize },

    #[error("image URL is not absolute http(s): {0}")]
    InvalidImage(String),

    #[error("image URL appears more than once: {0}")]
    DuplicateImage(String),
}

/// A bounding box that is not `[ymin, xmin, ymax, xmax]` within 0-1000.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundingBoxError {
    #[error("expected 4 coordinates, got {0}")]
    Arity(usize),

    #[error("coordinate {0} is outside the 0-1000 range")]
    OutOfRange(i64),

    #[error("ymin ({ymin}) must be less than ymax ({ymax})")]
    Vertical { ymin: i64, ymax: i64 },

    #[error("xmin ({xmin}) must be less than xmax ({xmax})")]
    Horizontal { xmin: i64, xmax: i64 },
}

/// Local failure inside one extraction strategy. Never escapes the
/// strategy chain.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("expected attribute '{0}' is missing")]
    MissingAttribute(&'static str),
}
