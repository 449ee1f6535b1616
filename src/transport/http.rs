// src/transport/http.rs

use reqwest::Client;
use std::time::Instant;

use crate::errors::Result;
use crate::transport::{Auth, HttpRequest, HttpResponse, Method, Transport};

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a new `HttpTransport`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };

        log::debug!("Calling Alloy: {} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(method, &request.url)
            .header("Accept", "application/json");

        builder = match &request.auth {
            Some(Auth::Bearer(token)) => builder.bearer_auth(token),
            Some(Auth::Basic { username, password }) => builder.basic_auth(username, Some(password)),
            None => builder,
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let resp = builder.send().await?;

        let status = resp.status().as_u16();
        let latency_ms = start.elapsed().as_millis() as u64;
        log::debug!("Alloy response status: {} ({}ms)", status, latency_ms);

        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}
