// src/llm/provider.rs
// Generation backend trait and the types that flow through it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a conversation, in chronological order within a history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Caller-controlled sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl GenerationParams {
    /// Reject values outside the ranges the sampler accepts.
    pub fn validate(&self, max_new_tokens_limit: u32) -> Result<()> {
        if self.max_new_tokens == 0 || self.max_new_tokens > max_new_tokens_limit {
            return Err(ServiceError::InvalidParameter(format!(
                "max_new_tokens must be between 1 and {}, got {}",
                max_new_tokens_limit, self.max_new_tokens
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ServiceError::InvalidParameter(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ServiceError::InvalidParameter(format!(
                "top_p must be between 0 and 1, got {}",
                self.top_p
            )));
        }
        Ok(())
    }

    /// Temperature 0 means greedy decoding
    pub fn do_sample(&self) -> bool {
        self.temperature > 0.0
    }
}

/// Fixed anti-repetition controls applied to every generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingControls {
    pub repetition_penalty: f32,
    pub no_repeat_ngram_size: u32,
}

pub const DECODING_CONTROLS: DecodingControls = DecodingControls {
    repetition_penalty: 1.1,
    no_repeat_ngram_size: 2,
};

/// A causal language model that continues a fully formatted prompt.
///
/// Implementations return the decoded sequence *including* the prompt, the
/// way a local `generate` + `decode` of the whole output would; special
/// tokens may still be present.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name for logging/debugging
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}
