//! Error types for Docket operations
//!
//! All enums are `Clone`: a failed coalesced fetch hands the same error to
//! every task that was waiting on it.

use thiserror::Error;

/// Request cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cached value for key {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Fetch for key {key} stopped before producing a value: {reason}")]
    FetchAborted { key: String, reason: String },

    #[error("No Tokio runtime available to fetch key {key}")]
    NoRuntime { key: String },
}

/// HTTP API errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl ApiError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Response envelope errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Response envelope has no record list (found {found})")]
    NoList { found: &'static str },

    #[error("Response envelope has no record object (found {found})")]
    NoItem { found: &'static str },

    #[error("Record is missing a usable id field")]
    MissingId,

    #[error("Record could not be decoded: {reason}")]
    InvalidRecord { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or DOCKET_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {0}")]
    Parse(String),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all Docket errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocketError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Docket operations.
pub type DocketResult<T> = Result<T, DocketError>;

// =============================================================================
// TESTS
// =============================================================================
