// src/client/http.rs
// Typed HTTP client for a running persona-chat server

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::api::types::{ChatRequest, ChatResponse, HealthResponse};
use crate::persona::PersonaRecord;

/// Chat replies can take minutes on CPU backends
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request timed out after {0} seconds, the server did not respond")]
    Timeout(u64),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("server error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

/// `/stats` body, kept untyped: the label tables are ordered JSON maps
pub type StatsResponse = serde_json::Value;

pub struct PersonaChatClient {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl PersonaChatClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout_secs)
        } else {
            ClientError::Connection(err.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            // Prefer the server's error message over the raw body
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::read_json(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    pub async fn get_persona(&self, index: i64) -> Result<PersonaRecord, ClientError> {
        self.get(&format!("/personas/{}", index)).await
    }

    pub async fn stats(&self) -> Result<StatsResponse, ClientError> {
        self.get("/stats").await
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/chat", self.base_url);
        debug!(
            "POST {} (persona {}, {} turns)",
            url,
            request.persona_index,
            request.messages.len()
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::read_json(response).await
    }
}
