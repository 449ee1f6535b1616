// src/client.rs

use serde::Serialize;
use std::time::Instant;

use crate::auth::TokenProvider;
use crate::config::KycConfig;
use crate::errors::{KycError, Result};
use crate::evaluation::{ApplicantFields, Evaluation, OowResponses};
use crate::transport::{Auth, HttpRequest, HttpTransport, Method, Transport};

pub const EVALUATIONS_PATH: &str = "/evaluations";

/// Client for the Alloy evaluations API.
///
/// Every call is one authenticated round trip and returns a fresh
/// [`Evaluation`]; nothing is shared between the values it hands out.
pub struct KycClient<T: Transport = HttpTransport> {
    config: KycConfig,
    tokens: TokenProvider,
    transport: T,
}

impl KycClient<HttpTransport> {
    /// Client over a default `reqwest` transport.
    pub fn from_config(config: KycConfig) -> Result<Self> {
        Self::new(config, HttpTransport::default())
    }
}

impl<T: Transport> KycClient<T> {
    pub fn new(config: KycConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let tokens = TokenProvider::from_config(&config)?;
        Ok(Self { config, tokens, transport })
    }

    pub fn config(&self) -> &KycConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submits applicant data for a new decision.
    pub async fn create(&self, fields: &ApplicantFields) -> Result<Evaluation> {
        self.call(Method::Post, EVALUATIONS_PATH.to_string(), Some(to_body(fields)?))
            .await
    }

    /// Looks up an existing evaluation.
    pub async fn fetch(&self, evaluation_token: &str) -> Result<Evaluation> {
        self.call(Method::Get, evaluation_path(evaluation_token), None).await
    }

    /// Answers an out-of-wallet challenge. The result keeps the same token.
    pub async fn submit_oow_responses(
        &self,
        evaluation: &Evaluation,
        responses: &OowResponses,
    ) -> Result<Evaluation> {
        let token = evaluation.evaluation_token().ok_or(KycError::MissingToken)?;
        self.call(Method::Patch, evaluation_path(token), Some(to_body(responses)?))
            .await
    }

    /// Starts an independent evaluation from an existing one. The result has a new token.
    pub async fn fork(&self, evaluation: &Evaluation) -> Result<Evaluation> {
        let token = evaluation.evaluation_token().ok_or(KycError::MissingToken)?;
        let path = format!("{}/fork", evaluation_path(token));
        self.call(Method::Post, path, Some(serde_json::json!({}))).await
    }

    async fn call(&self, method: Method, path: String, body: Option<serde_json::Value>) -> Result<Evaluation> {
        let bearer = self.tokens.get_token(&self.transport, &self.config).await?;

        let request = HttpRequest {
            method,
            url: self.config.endpoint(&path),
            path,
            auth: Some(Auth::Bearer(bearer.access_token)),
            body,
        };

        log::info!("{} {}", request.method, request.path);
        let label = format!("{} {}", request.method, request.path);
        let start = Instant::now();

        let resp = self.transport.send(request).await.map_err(|e| {
            log::warn!("{} failed: {}", label, e);
            e
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let evaluation = Evaluation::from_response(resp.status, &resp.body)?;

        match evaluation.error_message() {
            Some(message) => log::warn!("{} -> {} ({}ms): {}", label, resp.status, latency_ms, message),
            None => log::info!(
                "{} -> {} ({}ms) result={}",
                label,
                resp.status,
                latency_ms,
                evaluation.result().map(|r| r.to_string()).unwrap_or_default()
            ),
        }

        Ok(evaluation)
    }
}

fn evaluation_path(token: &str) -> String {
    format!("{}/{}", EVALUATIONS_PATH, token)
}

fn to_body<S: Serialize>(value: &S) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
