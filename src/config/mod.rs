// src/config/mod.rs
// Service configuration loaded from the environment (and an optional .env file)

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL_ID: &str = "Qwen/Qwen3-1.7B";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    // ── Server
    pub host: String,
    pub port: u16,

    // ── Model
    pub model_id: String,
    pub tokenizer_path: PathBuf,
    pub backend_url: String,
    pub backend_api_key: Option<String>,
    pub backend_timeout: u64,
    pub disable_model: bool,

    // ── Generation limits
    pub max_context_tokens: usize,
    pub max_new_tokens_limit: u32,

    // ── Dataset
    pub dataset_path: PathBuf,

    // ── Logging
    pub log_level: String,
}

// Values may carry trailing comments and whitespace ("8080  # api port").
fn parse_env_value<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match raw {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        None => default,
    }
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    parse_env_value(key, std::env::var(key).ok(), default)
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            model_id: DEFAULT_MODEL_ID.to_string(),
            tokenizer_path: PathBuf::from("models/Qwen3-1.7B/tokenizer.json"),
            backend_url: "http://localhost:8000".to_string(),
            backend_api_key: None,
            backend_timeout: 300,
            disable_model: false,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            max_new_tokens_limit: 8192,
            dataset_path: PathBuf::from("data/personas.jsonl"),
            log_level: "info".to_string(),
        }
    }
}

impl ChatConfig {
    /// Load from `.env` (if present) and the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_current_env()
    }

    /// Read the process environment only, falling back to defaults.
    pub fn from_current_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_var_or("PERSONA_CHAT_HOST", defaults.host),
            port: env_var_or("PERSONA_CHAT_PORT", defaults.port),
            model_id: env_var_or("PERSONA_CHAT_MODEL_ID", defaults.model_id),
            tokenizer_path: env_var_or("PERSONA_CHAT_TOKENIZER", defaults.tokenizer_path),
            backend_url: env_var_or("PERSONA_CHAT_BACKEND_URL", defaults.backend_url),
            backend_api_key: env_var_opt("PERSONA_CHAT_BACKEND_API_KEY"),
            backend_timeout: env_var_or("PERSONA_CHAT_BACKEND_TIMEOUT", defaults.backend_timeout),
            disable_model: env_var_or("PERSONA_CHAT_DISABLE_MODEL", defaults.disable_model),
            max_context_tokens: env_var_or(
                "PERSONA_CHAT_MAX_CONTEXT_TOKENS",
                defaults.max_context_tokens,
            ),
            max_new_tokens_limit: env_var_or(
                "PERSONA_CHAT_MAX_NEW_TOKENS_LIMIT",
                defaults.max_new_tokens_limit,
            ),
            dataset_path: env_var_or("PERSONA_CHAT_DATASET", defaults.dataset_path),
            log_level: env_var_or("PERSONA_CHAT_LOG_LEVEL", defaults.log_level),
        }
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout)
    }

    /// Command-line flags win over the environment.
    pub fn apply_overrides(&mut self, overrides: ServeOverrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dataset) = overrides.dataset {
            self.dataset_path = dataset;
        }
        if let Some(tokenizer) = overrides.tokenizer {
            self.tokenizer_path = tokenizer;
        }
        if let Some(url) = overrides.backend_url {
            self.backend_url = url;
        }
        self.disable_model |= overrides.no_model;
    }
}

/// `serve` flags; `None` keeps the environment value
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dataset: Option<PathBuf>,
    pub tokenizer: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub no_model: bool,
}
