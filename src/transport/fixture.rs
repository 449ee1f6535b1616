// src/transport/fixture.rs
//! Replays canned responses keyed by method and path.
//!
//! Cassettes are JSON files of the form
//!
//! ```json
//! { "interactions": [
//!     { "method": "POST", "path": "/evaluations", "status": 201, "body": { "...": "..." } }
//! ] }
//! ```
//!
//! Several interactions for the same method+path are served in order and the
//! last one keeps repeating. Query strings are ignored when matching.

use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{KycError, Result};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

#[derive(Deserialize, Debug, Clone)]
pub struct Cassette {
    pub interactions: Vec<Interaction>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Interaction {
    pub method: String,
    pub path: String,
    pub status: u16,
    /// A JSON string is replayed verbatim, anything else is serialized.
    #[serde(default)]
    pub body: serde_json::Value,
}

type Key = (Method, String);

#[derive(Debug, Default)]
pub struct FixtureTransport {
    responses: Mutex<HashMap<Key, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    format!("/{}", path.trim_matches('/'))
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `method` + `path`.
    pub fn with_response(self, method: Method, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.push(method, path, HttpResponse::new(status, render_body(&body)));
        self
    }

    pub fn with_cassette(self, cassette: Cassette) -> Result<Self> {
        for interaction in cassette.interactions {
            let method = Method::parse(&interaction.method).ok_or_else(|| {
                KycError::Config(format!("unsupported method '{}' in cassette", interaction.method))
            })?;
            self.push(
                method,
                &interaction.path,
                HttpResponse::new(interaction.status, render_body(&interaction.body)),
            );
        }
        Ok(self)
    }

    pub fn with_cassette_str(self, raw: &str) -> Result<Self> {
        let cassette: Cassette = serde_json::from_str(raw)?;
        self.with_cassette(cassette)
    }

    pub fn with_cassette_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded cassette {}", path.as_ref().display());
        self.with_cassette_str(&raw)
    }

    fn push(&self, method: Method, path: &str, response: HttpResponse) {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses
            .entry((method, normalize_path(path)))
            .or_default()
            .push_back(response);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        let path = normalize_path(path);
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && normalize_path(&r.path) == path)
            .collect()
    }

    fn next_response(&self, method: Method, path: &str) -> Option<HttpResponse> {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let queue = responses.get_mut(&(method, normalize_path(path)))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn render_body(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(raw) => raw.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Transport for FixtureTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.next_response(request.method, &request.path);
        let miss = format!("no fixture for {} {}", request.method, request.path);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        response.ok_or(KycError::Transport(miss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: path.to_string(),
            url: format!("http://fixture{path}"),
            auth: None,
            body: None,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_repeats_last() {
        let transport = FixtureTransport::new()
            .with_response(Method::Get, "/evaluations/L-1", 201, json!({"n": 1}))
            .with_response(Method::Get, "/evaluations/L-1", 201, json!({"n": 2}));

        let first = transport.send(request(Method::Get, "/evaluations/L-1")).await.unwrap();
        let second = transport.send(request(Method::Get, "/evaluations/L-1")).await.unwrap();
        let third = transport.send(request(Method::Get, "/evaluations/L-1")).await.unwrap();

        assert_eq!(first.body, r#"{"n":1}"#);
        assert_eq!(second.body, r#"{"n":2}"#);
        assert_eq!(third.body, r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn test_matches_on_method_and_path_only() {
        let transport = FixtureTransport::new().with_response(Method::Post, "/evaluations", 201, json!({}));

        assert!(transport.send(request(Method::Post, "/evaluations/?debug=1")).await.is_ok());
        let err = transport.send(request(Method::Get, "/evaluations")).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(transport.requests_to(Method::Post, "/evaluations").len(), 1);
    }

    #[tokio::test]
    async fn test_cassette_string_body_is_verbatim() {
        let transport = FixtureTransport::new()
            .with_cassette_str(
                r#"{"interactions": [
                    {"method": "get", "path": "evaluations/L-9", "status": 502, "body": "Bad Gateway"}
                ]}"#,
            )
            .unwrap();

        let resp = transport.send(request(Method::Get, "/evaluations/L-9")).await.unwrap();
        assert_eq!(resp.status, 502);
        assert_eq!(resp.body, "Bad Gateway");
    }

    #[test]
    fn test_cassette_rejects_unknown_method() {
        let err = FixtureTransport::new()
            .with_cassette_str(r#"{"interactions": [{"method": "DELETE", "path": "/x", "status": 200}]}"#)
            .unwrap_err();
        assert!(matches!(err, KycError::Config(_)));
    }
}
