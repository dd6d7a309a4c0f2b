use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryWallError {
    #[error("Missing configuration: {name} is not set")]
    MissingConfig { name: String },

    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("Feed request failed for {url}: {reason}")]
    FeedFailed { url: String, reason: String },

    #[error("Transcript request failed for {video_url}: {reason}")]
    TranscriptFailed { video_url: String, reason: String },

    #[error("Store request {operation} failed with status {status}: {body}")]
    StoreFailed {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Model invocation failed: {reason}")]
    ModelFailed { reason: String },

    #[error("Model invocation timed out after {seconds}s")]
    ModelTimedOut { seconds: u64 },

    #[error("Model reply could not be turned into a summary: {reason}")]
    SummaryFormat { reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

impl SummaryWallError {
    pub fn missing_config(name: impl Into<String>) -> Self {
        Self::MissingConfig { name: name.into() }
    }

    pub fn model_failed(reason: impl Into<String>) -> Self {
        Self::ModelFailed {
            reason: reason.into(),
        }
    }

    pub fn summary_format(reason: impl Into<String>) -> Self {
        Self::SummaryFormat {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryWallError>;
