// tests/test_helpers.rs
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use persona_chat::{
    config::ChatConfig,
    error::{Result, ServiceError},
    llm::{GenerationParams, PromptTokenizer, TextGenerator},
    persona::{PersonaRecord, PersonaStore},
    state::{AppState, LoadedResources, ModelHandle, ServiceContext, ServiceSettings},
};

/// One token per character. Decoding with `skip_special_tokens` drops the
/// ChatML markers, the way the real tokenizer does.
pub struct CharTokenizer;

impl PromptTokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(|c| c as u32).collect())
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        let text: String = ids.iter().filter_map(|id| char::from_u32(*id)).collect();
        if skip_special_tokens {
            Ok(text.replace("<|im_start|>", "").replace("<|im_end|>", ""))
        } else {
            Ok(text)
        }
    }
}

/// Echoes the prompt followed by a canned continuation, and remembers
/// what it was asked.
pub struct ScriptedGenerator {
    pub continuation: String,
    pub fail_with: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(continuation: &str) -> Arc<Self> {
        Arc::new(Self {
            continuation: continuation.to_string(),
            fail_with: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            continuation: String::new(),
            fail_with: Some(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.fail_with {
            return Err(ServiceError::Inference(message.clone()));
        }
        Ok(format!("{}{}<|im_end|>", prompt, self.continuation))
    }
}

/// Biography of persona 0. Longer than 200 characters so both the fallback
/// quote and the summary cut apply.
pub fn care_worker_biography() -> String {
    format!(
        "東京都在住の72歳の介護福祉士。{}",
        "長年高齢者施設で働き、利用者の笑顔を何よりの励みにしている。".repeat(8)
    )
}

pub fn sample_personas() -> PersonaStore {
    let rows = vec![
        json!({
            "persona": care_worker_biography(),
            "occupation": "介護福祉士",
            "age": 72,
            "region": "関東地方",
            "prefecture": "東京都",
            "sex": "女性"
        }),
        json!({
            "persona": "大阪で中学校の社会科を教える教師。",
            "occupation": "教師",
            "age": 45,
            "region": "近畿地方"
        }),
        json!({
            "persona": "札幌の総合病院に勤める看護師。",
            "occupation": "看護師",
            "age": 30,
            "region": "北海道地方"
        }),
        json!({
            "persona": "地域不明の会社員。",
            "occupation": "教師",
            "age": 38
        }),
    ];
    let records: Vec<PersonaRecord> = rows
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();
    PersonaStore::from_records(records)
}

pub fn test_settings() -> ServiceSettings {
    ServiceSettings::from(&ChatConfig::default())
}

pub fn model_handle(generator: Arc<ScriptedGenerator>) -> ModelHandle {
    ModelHandle {
        generator,
        tokenizer: Arc::new(CharTokenizer),
    }
}

/// Ready context with personas and, optionally, a model.
pub fn ready_context(model: Option<ModelHandle>) -> ServiceContext {
    let model_error = model
        .is_none()
        .then(|| "Model load error: test has no model".to_string());
    ServiceContext::with_resources(
        test_settings(),
        LoadedResources {
            personas: Some(Arc::new(sample_personas())),
            model,
            startup_error: None,
            model_error,
        },
    )
}

pub fn create_test_app_state(context: ServiceContext) -> Arc<AppState> {
    Arc::new(AppState::new(context))
}

pub fn create_test_app(context: ServiceContext) -> axum::Router {
    persona_chat::api::http_router(create_test_app_state(context))
}
