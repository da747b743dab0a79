// src/llm/completions.rs
// OpenAI-compatible /v1/completions client (vLLM, llama.cpp server, ...)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::provider::{DecodingControls, GenerationParams, TextGenerator, DECODING_CONTROLS};
use crate::error::{Result, ServiceError};
use crate::prompt::formatter::IM_END;

/// Normalize base URL by stripping trailing slashes and a /v1 suffix
fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim_end_matches('/').to_string();
    if url.ends_with("/v1") {
        url.truncate(url.len() - 3);
    }
    url
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

/// Generation backend talking to a model server over HTTP
pub struct CompletionsClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    controls: DecodingControls,
    client: Client,
}

impl CompletionsClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let normalized = normalize_base_url(base_url);
        url::Url::parse(&normalized)
            .map_err(|e| anyhow::anyhow!("invalid backend URL '{}': {}", base_url, e))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: normalized,
            model: model.into(),
            api_key,
            controls: DECODING_CONTROLS,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Check that the server answers and lists models.
    pub async fn check_ready(&self) -> Result<()> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(ServiceError::Backend(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }
        info!("Generation backend reachable at {}", self.base_url);
        Ok(())
    }

    fn request_body(&self, prompt: &str, params: &GenerationParams) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": params.max_new_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "repetition_penalty": self.controls.repetition_penalty,
            "no_repeat_ngram_size": self.controls.no_repeat_ngram_size,
            "echo": true,
            "stop": [IM_END],
        })
    }
}

#[async_trait]
impl TextGenerator for CompletionsClient {
    fn name(&self) -> &'static str {
        "openai-completions"
    }

    #[instrument(
        skip(self, prompt, params),
        fields(
            model = %self.model,
            max_new_tokens = params.max_new_tokens,
            sampling = params.do_sample()
        )
    )]
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);
        let started = Instant::now();

        let response = self
            .authorized(self.client.post(&url))
            .json(&self.request_body(prompt, params))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Backend(format!("{} answered {}: {}", url, status, body)));
        }

        let completion: CompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Inference("backend returned no choices".to_string()))?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "completion usage"
            );
        }
        info!(
            latency_ms = started.elapsed().as_millis() as u64,
            finish_reason = ?choice.finish_reason,
            "generation finished"
        );

        // Servers that ignore `echo` return only the continuation
        if choice.text.starts_with(prompt) {
            Ok(choice.text)
        } else {
            warn!("backend did not echo the prompt, prepending it");
            Ok(format!("{}{}", prompt, choice.text))
        }
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
#[cfg(test)]
pub(crate) async fn spawn_test_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };

    fn client() -> CompletionsClient {
        CompletionsClient::new("http://localhost:8000/v1/", "Qwen/Qwen3-1.7B", None, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:8000/v1/"), "http://localhost:8000");
        assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert!(CompletionsClient::new("not a url", "m", None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_request_body_carries_fixed_controls() {
        let params = GenerationParams { max_new_tokens: 64, temperature: 0.7, top_p: 0.95 };
        let body = client().request_body("PROMPT", &params);
        assert_eq!(body["model"], "Qwen/Qwen3-1.7B");
        assert_eq!(body["prompt"], "PROMPT");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["no_repeat_ngram_size"], 2);
        assert_eq!(body["echo"], true);
        assert_eq!(body["stop"][0], "<|im_end|>");
        assert!((body["repetition_penalty"].as_f64().unwrap() - 1.1).abs() < 1e-6);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);

        let greedy = GenerationParams { temperature: 0.0, ..params };
        assert_eq!(client().request_body("PROMPT", &greedy)["temperature"], 0.0);
    }

    #[test]
    fn test_parse_completion_response() {
        let raw = r#"{"choices":[{"text":"hi","finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":1}}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].text, "hi");
        assert_eq!(parsed.usage.unwrap().completion_tokens, Some(1));
    }

    async fn backend_client(router: Router) -> CompletionsClient {
        let base_url = spawn_test_backend(router).await;
        CompletionsClient::new(&base_url, "test-model", None, Duration::from_secs(5)).unwrap()
    }

    fn params() -> GenerationParams {
        GenerationParams { max_new_tokens: 16, temperature: 0.7, top_p: 0.9 }
    }

    #[tokio::test]
    async fn test_generate_returns_echoed_sequence() {
        let router = Router::new().route(
            "/v1/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["echo"], true);
                assert_eq!(body["model"], "test-model");
                let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                Json(json!({"choices": [{"text": format!("{}こんにちは", prompt), "finish_reason": "stop"}]}))
            }),
        );
        let client = backend_client(router).await;

        let output = client.generate("PROMPT:", &params()).await.unwrap();
        assert_eq!(output, "PROMPT:こんにちは");
    }

    #[tokio::test]
    async fn test_generate_prepends_prompt_when_not_echoed() {
        let router = Router::new().route(
            "/v1/completions",
            post(|| async { Json(json!({"choices": [{"text": " only the continuation"}]})) }),
        );
        let client = backend_client(router).await;

        let output = client.generate("PROMPT:", &params()).await.unwrap();
        assert_eq!(output, "PROMPT: only the continuation");
    }

    #[tokio::test]
    async fn test_generate_error_status_is_backend_error_with_body() {
        let router = Router::new().route(
            "/v1/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let client = backend_client(router).await;

        match client.generate("PROMPT:", &params()).await {
            Err(ServiceError::Backend(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("model crashed"));
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_without_choices_is_inference_error() {
        let router = Router::new().route(
            "/v1/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let client = backend_client(router).await;

        let err = client.generate("PROMPT:", &params()).await.unwrap_err();
        assert_eq!(err, ServiceError::Inference("backend returned no choices".to_string()));
    }

    #[tokio::test]
    async fn test_check_ready_against_models_endpoint() {
        let healthy = Router::new().route(
            "/v1/models",
            get(|| async { Json(json!({"data": [{"id": "test-model"}]})) }),
        );
        assert!(backend_client(healthy).await.check_ready().await.is_ok());

        let down = Router::new().route(
            "/v1/models",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
        );
        let err = backend_client(down).await.check_ready().await.unwrap_err();
        assert!(matches!(err, ServiceError::Backend(ref m) if m.contains("503")));
    }
}
