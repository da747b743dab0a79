// src/state.rs
// Explicitly constructed service context shared by every request handler

use std::sync::{Arc, OnceLock};

use crate::config::ChatConfig;
use crate::error::{Result, ServiceError};
use crate::llm::{PromptTokenizer, TextGenerator};
use crate::persona::PersonaStore;
use crate::services::ChatService;

/// Fixed, request-independent settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub model_id: String,
    pub max_context_tokens: usize,
    pub max_new_tokens_limit: u32,
}

impl From<&ChatConfig> for ServiceSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            model_id: config.model_id.clone(),
            max_context_tokens: config.max_context_tokens,
            max_new_tokens_limit: config.max_new_tokens_limit,
        }
    }
}

/// A generation backend together with the tokenizer of the same model
#[derive(Clone)]
pub struct ModelHandle {
    pub generator: Arc<dyn TextGenerator>,
    pub tokenizer: Arc<dyn PromptTokenizer>,
}

/// Everything the startup phase produced. Published once, never mutated.
#[derive(Clone, Default)]
pub struct LoadedResources {
    pub personas: Option<Arc<PersonaStore>>,
    pub model: Option<ModelHandle>,
    /// Fatal startup failure (dataset); data endpoints answer 503 until restart
    pub startup_error: Option<String>,
    /// Why the model is unavailable; `/chat` falls back to templated replies
    pub model_error: Option<String>,
}

impl LoadedResources {
    pub fn total_personas(&self) -> usize {
        self.personas.as_ref().map_or(0, |p| p.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Starting,
    Ready,
    Failed,
}

/// Point-in-time view used by `/` and `/health`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub readiness: Readiness,
    pub model_loaded: bool,
    pub personas_loaded: bool,
    pub total_personas: usize,
    pub startup_error: Option<String>,
    pub model_error: Option<String>,
}

/// Handle to the shared model/tokenizer/dataset.
///
/// Created empty before the server starts listening; the loader publishes
/// `LoadedResources` in a single step, so a request sees either nothing
/// (still starting) or the complete result, never a partial load.
#[derive(Clone)]
pub struct ServiceContext {
    settings: Arc<ServiceSettings>,
    resources: Arc<OnceLock<LoadedResources>>,
}

impl ServiceContext {
    /// Context whose resources are still being loaded
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            resources: Arc::new(OnceLock::new()),
        }
    }

    /// Context that is ready immediately (tests, embedding)
    pub fn with_resources(settings: ServiceSettings, resources: LoadedResources) -> Self {
        let ctx = Self::new(settings);
        ctx.publish(resources);
        ctx
    }

    /// Publish startup results. Only the first call wins.
    pub fn publish(&self, resources: LoadedResources) -> bool {
        self.resources.set(resources).is_ok()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    pub fn resources(&self) -> Option<&LoadedResources> {
        self.resources.get()
    }

    /// Resources of a successful startup
    pub fn ready(&self) -> Result<&LoadedResources> {
        let resources = self.resources().ok_or(ServiceError::Loading)?;
        match &resources.startup_error {
            Some(err) => Err(ServiceError::StartupFailed(err.clone())),
            None => Ok(resources),
        }
    }

    /// The persona dataset, available even when the model failed to load
    pub fn personas(&self) -> Result<&Arc<PersonaStore>> {
        let resources = self.resources().ok_or(ServiceError::Loading)?;
        resources
            .personas
            .as_ref()
            .ok_or(ServiceError::PersonasNotLoaded)
    }

    pub fn readiness(&self) -> Readiness {
        match self.resources() {
            None => Readiness::Starting,
            Some(r) if r.startup_error.is_some() => Readiness::Failed,
            Some(_) => Readiness::Ready,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let resources = self.resources();
        StatusSnapshot {
            readiness: self.readiness(),
            model_loaded: resources.is_some_and(|r| r.model.is_some()),
            personas_loaded: resources.is_some_and(|r| r.personas.is_some()),
            total_personas: resources.map_or(0, |r| r.total_personas()),
            startup_error: resources.and_then(|r| r.startup_error.clone()),
            model_error: resources.and_then(|r| r.model_error.clone()),
        }
    }
}

/// Axum state: the context plus the services built on it
#[derive(Clone)]
pub struct AppState {
    pub context: ServiceContext,
    pub chat_service: Arc<ChatService>,
}

impl AppState {
    pub fn new(context: ServiceContext) -> Self {
        let chat_service = Arc::new(ChatService::new(context.clone()));
        Self {
            context,
            chat_service,
        }
    }
}
