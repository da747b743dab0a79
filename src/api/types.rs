// src/api/types.rs
use serde::{Deserialize, Serialize};

use crate::llm::provider::{DEFAULT_MAX_NEW_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use crate::llm::{ChatTurn, GenerationParams};
use crate::persona::PersonaSummary;
use crate::services::{ChatInput, ChatOutcome};

fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "turns")]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub persona_index: i64,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatTurn>, persona_index: i64) -> Self {
        Self {
            messages,
            persona_index,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

impl From<ChatRequest> for ChatInput {
    fn from(request: ChatRequest) -> Self {
        let params = request.params();
        Self {
            history: request.messages,
            persona_index: request.persona_index,
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub persona_info: PersonaSummary,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            reply: outcome.reply,
            persona_info: outcome.persona_info,
        }
    }
}

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub model: String,
    pub model_loaded: bool,
    pub personas_loaded: bool,
    pub total_personas: usize,
    pub startup_error: Option<String>,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub model_loaded: bool,
    pub personas_loaded: bool,
    pub total_personas: usize,
    pub startup_error: Option<String>,
    pub model_error: Option<String>,
    pub version: String,
    pub timestamp: String,
}
