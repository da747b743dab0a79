// src/startup.rs
// Loads dataset, tokenizer and backend once, off the request path

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ChatConfig;
use crate::llm::{CompletionsClient, HfTokenizer};
use crate::persona::PersonaStore;
use crate::state::{LoadedResources, ModelHandle, ServiceContext};

async fn load_personas(config: &ChatConfig) -> anyhow::Result<PersonaStore> {
    let path = config.dataset_path.clone();
    tokio::task::spawn_blocking(move || PersonaStore::load(&path)).await?
}

async fn load_model(config: &ChatConfig) -> anyhow::Result<ModelHandle> {
    let client = CompletionsClient::new(
        &config.backend_url,
        config.model_id.clone(),
        config.backend_api_key.clone(),
        config.backend_timeout(),
    )?;
    client.check_ready().await?;

    info!("Loading tokenizer from {}", config.tokenizer_path.display());
    let path = config.tokenizer_path.clone();
    let tokenizer = tokio::task::spawn_blocking(move || HfTokenizer::from_file(&path)).await??;

    Ok(ModelHandle {
        generator: Arc::new(client),
        tokenizer: Arc::new(tokenizer),
    })
}

/// Run the whole startup sequence. Never fails: problems are recorded in
/// the returned resources and surfaced through `/health`.
pub async fn load_resources(config: &ChatConfig) -> LoadedResources {
    let personas = match load_personas(config).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            let msg = format!("Startup error: {:#}", e);
            error!("{}", msg);
            return LoadedResources {
                startup_error: Some(msg),
                ..Default::default()
            };
        }
    };

    if config.disable_model {
        info!("Model loading disabled, chat replies will use the fallback template");
        return LoadedResources {
            personas: Some(personas),
            ..Default::default()
        };
    }

    info!("Loading model {}", config.model_id);
    match load_model(config).await {
        Ok(model) => {
            info!("System ready for persona-aware chat with {}", config.model_id);
            LoadedResources {
                personas: Some(personas),
                model: Some(model),
                ..Default::default()
            }
        }
        Err(e) => {
            let msg = format!("Model load error: {:#}", e);
            warn!("{} (falling back to templated replies)", msg);
            LoadedResources {
                personas: Some(personas),
                model_error: Some(msg),
                ..Default::default()
            }
        }
    }
}

/// Load in the background and publish into `ctx` when done.
pub fn spawn_loader(ctx: ServiceContext, config: ChatConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let resources = load_resources(&config).await;
        if !ctx.publish(resources) {
            warn!("Startup resources were already published, ignoring second load");
        }
    })
}
