// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use persona_chat::api::http_router;
use persona_chat::client::{PersonaChatClient, Repl};
use persona_chat::config::{ChatConfig, ServeOverrides};
use persona_chat::startup::spawn_loader;
use persona_chat::state::{AppState, ServiceContext, ServiceSettings};

#[derive(Parser)]
#[command(name = "persona-chat")]
#[command(about = "Persona-conditioned chat over a Japanese persona dataset", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP chat service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Persona dataset (.jsonl or .json)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// tokenizer.json of the served model
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// OpenAI-compatible completions server
        #[arg(long)]
        backend_url: Option<String>,

        /// Skip model loading and answer with templated replies
        #[arg(long)]
        no_model: bool,
    },

    /// Interactive terminal chat against a running server
    Chat {
        #[arg(long, env = "PERSONA_CHAT_SERVER", default_value = "http://localhost:8080")]
        server: String,
    },
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).init();
}

async fn serve(config: ChatConfig) -> Result<()> {
    info!("Starting persona chat service");
    info!("Model: {}", config.model_id);
    info!("Dataset: {}", config.dataset_path.display());

    let context = ServiceContext::new(ServiceSettings::from(&config));
    let app_state = Arc::new(AppState::new(context.clone()));
    let app = http_router(app_state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("HTTP server listening on http://{}", bind_address);

    // Resources load in the background; requests get 503 until they are published
    let loader = spawn_loader(context, config);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    loader.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = ChatConfig::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            dataset,
            tokenizer,
            backend_url,
            no_model,
        } => {
            init_logging(&config.log_level);

            config.apply_overrides(ServeOverrides {
                host,
                port,
                dataset,
                tokenizer,
                backend_url,
                no_model,
            });

            serve(config).await
        }
        Commands::Chat { server } => {
            // The REPL owns the terminal; keep logging quiet unless asked for
            init_logging("warn");
            Repl::new(PersonaChatClient::new(&server)).run().await
        }
    }
}
