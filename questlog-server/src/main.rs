//! Questlog API server binary

use anyhow::Context;
use questlog_core::logging::{init_tracing, TracingConfig};
use questlog_server::ai::gemini::GeminiClient;
use questlog_server::ai::{TextGenerator, UnavailableGenerator};
use questlog_server::config::{ServerConfig, StorageBackend};
use questlog_server::storage::{init_memory_storage, init_postgres_storage};
use questlog_server::{api, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;
    init_tracing(&TracingConfig::with_level(config.log_level));

    info!("Starting Questlog server v{}", env!("CARGO_PKG_VERSION"));

    // ========================================================================
    // 1. Storage
    // ========================================================================
    let storage = match config.storage_backend {
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            init_postgres_storage(&config.database_url, config.pg_max_connections)
                .await
                .context("PostgreSQL connection failed")?
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            init_memory_storage(MemoryStore::new())
        }
    };

    // ========================================================================
    // 2. Text generation
    // ========================================================================
    let generator: Arc<dyn TextGenerator> = match &config.gemini {
        Some(gemini) => {
            info!(model = %gemini.model, "Gemini text generation enabled");
            Arc::new(GeminiClient::new(gemini).context("failed to build Gemini client")?)
        }
        None => {
            warn!(
                "GEMINI_API_KEY not set; quests use templates, \
                 chat and skill proposals are unavailable"
            );
            Arc::new(UnavailableGenerator)
        }
    };

    // ========================================================================
    // 3. HTTP API (blocks until Ctrl-C)
    // ========================================================================
    let state = api::build_state(storage, generator, config.settings);
    api::start_api_server(state, config.api_port, shutdown_signal())
        .await
        .context("API server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
