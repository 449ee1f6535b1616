// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KycError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Bearer token request rejected with status {status}: {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Unrecognized summary result '{0}'")]
    UnknownResult(String),

    #[error("Evaluation has no summary result")]
    MissingResult,

    #[error("Evaluation has no evaluation_token")]
    MissingToken,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KycError {
    /// True when the HTTP exchange itself could not complete.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, KycError>;
