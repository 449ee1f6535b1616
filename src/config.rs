// src/config.rs
use serde::Deserialize;
use std::path::Path;

use crate::errors::{KycError, Result};

pub const DEFAULT_API_BASE: &str = "https://sandbox.alloy.co/v1";

/// Connection settings for the Alloy KYC API.
///
/// Passed explicitly to [`crate::client::KycClient`]; nothing is read from
/// process-wide state after construction.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct KycConfig {
    /// Base URL including the version segment, e.g. `https://sandbox.alloy.co/v1`.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Application token used as the basic-auth user on the token endpoint.
    #[serde(default)]
    pub application_token: Option<String>,

    /// Application secret used as the basic-auth password on the token endpoint.
    #[serde(default)]
    pub application_secret: Option<String>,

    /// Pre-issued bearer token. Skips the token endpoint when set.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl KycConfig {
    /// Configuration using client credentials against the default sandbox.
    pub fn new(application_token: impl Into<String>, application_secret: impl Into<String>) -> Self {
        Self {
            api_base: default_api_base(),
            application_token: Some(application_token.into()),
            application_secret: Some(application_secret.into()),
            bearer_token: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let config = KycConfig {
            api_base: non_empty("ALLOY_API_BASE").unwrap_or_else(default_api_base),
            application_token: non_empty("ALLOY_APPLICATION_TOKEN"),
            application_secret: non_empty("ALLOY_APPLICATION_SECRET"),
            bearer_token: non_empty("ALLOY_BEARER_TOKEN"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: KycConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Checks that some way of obtaining a bearer token is configured.
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(KycError::Config("api_base must not be empty".to_string()));
        }
        if self.bearer_token.is_some() {
            return Ok(());
        }
        self.client_credentials().map(|_| ())
    }

    /// Application token and secret, or a configuration error naming both.
    pub fn client_credentials(&self) -> Result<(&str, &str)> {
        match (&self.application_token, &self.application_secret) {
            (Some(token), Some(secret)) => Ok((token.as_str(), secret.as_str())),
            _ => Err(KycError::Config(
                "No credentials configured. Set ALLOY_BEARER_TOKEN or both ALLOY_APPLICATION_TOKEN and ALLOY_APPLICATION_SECRET.".to_string(),
            )),
        }
    }

    /// Joins `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
