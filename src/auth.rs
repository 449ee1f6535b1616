// src/auth.rs
//! Bearer-token acquisition.
//!
//! A token is requested once per logical operation and discarded afterwards.

use serde::Deserialize;
use serde_json::json;

use crate::config::KycConfig;
use crate::errors::{KycError, Result};
use crate::transport::{Auth, HttpRequest, Method, Transport};

pub const TOKEN_PATH: &str = "/oauth/bearer";

/// Where bearer tokens come from.
#[derive(Clone)]
pub enum TokenProvider {
    /// Pre-issued token, used as is.
    Static(String),

    /// Exchange application token and secret at the token endpoint.
    ClientCredentials {
        application_token: String,
        application_secret: String,
    },
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::ClientCredentials { application_token, .. } => f
                .debug_struct("ClientCredentials")
                .field("application_token", application_token)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BearerToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenProvider {
    /// A static bearer token wins over client credentials.
    pub fn from_config(config: &KycConfig) -> Result<Self> {
        if let Some(token) = &config.bearer_token {
            return Ok(Self::Static(token.clone()));
        }
        let (application_token, application_secret) = config.client_credentials()?;
        Ok(Self::ClientCredentials {
            application_token: application_token.to_string(),
            application_secret: application_secret.to_string(),
        })
    }

    pub async fn get_token<T: Transport>(&self, transport: &T, config: &KycConfig) -> Result<BearerToken> {
        let (application_token, application_secret) = match self {
            Self::Static(token) => {
                return Ok(BearerToken {
                    access_token: token.clone(),
                    token_type: Some("Bearer".to_string()),
                    expires_in: None,
                })
            }
            Self::ClientCredentials { application_token, application_secret } => {
                (application_token, application_secret)
            }
        };

        let request = HttpRequest {
            method: Method::Post,
            path: TOKEN_PATH.to_string(),
            url: config.endpoint(TOKEN_PATH),
            auth: Some(Auth::Basic {
                username: application_token.clone(),
                password: application_secret.clone(),
            }),
            body: Some(json!({ "grant_type": "client_credentials" })),
        };

        let resp = transport.send(request).await?;
        if !resp.is_success() {
            log::warn!("Bearer token request failed with status {}", resp.status);
            return Err(KycError::Unauthorized { status: resp.status, body: resp.body });
        }

        let token: BearerToken = serde_json::from_str(&resp.body)?;
        if token.access_token.is_empty() {
            return Err(KycError::UnexpectedResponse("empty access_token".to_string()));
        }
        log::debug!("Obtained bearer token (expires_in: {:?})", token.expires_in);
        Ok(token)
    }
}
