//! # Warden - Aegis Token Lifecycle Engine
//!
//! The core of Aegis. Owns the reCAPTCHA v3 token lifecycle: execution
//! against the token provider, validation gating, renewal scheduling,
//! and event fan-out to the host application.
//!
//! ## Architecture
//! ```text
//! Host app → Warden → Token provider
//!               ↓
//!      Events (tokenGenerated | error)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod events;
mod routes;
mod state;
mod token;
mod validation;

use aegis_common::constants::EVENT_LOG_CAPACITY;
use aegis_common::{EventKind, TokenEvent};
use config::AppConfig;
use events::{EventEmitter, EventLog};
use state::AppState;
use token::{HttpTokenProvider, TokenController, refresh_worker};
use validation::FormulaEvaluator;

/// Aegis Warden - Token Lifecycle Engine
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Token provider endpoint (overrides config)
    #[arg(long, env = "PROVIDER_ENDPOINT")]
    provider_endpoint: Option<String>,

    /// reCAPTCHA site key (overrides config)
    #[arg(long, env = "RECAPTCHA_SITE_KEY")]
    site_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🛡️ Starting Aegis Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Event fan-out: structured log + bounded history for /debug/events
    let emitter = Arc::new(EventEmitter::new());
    let event_log = Arc::new(EventLog::new(EVENT_LOG_CAPACITY));
    events::register_event_log(&emitter, event_log.clone());
    emitter.on(
        EventKind::Generated,
        Box::new(|event| {
            if let TokenEvent::Generated { token } = event {
                info!(token_len = token.len(), "Token generated");
            }
        }),
    );
    emitter.on(
        EventKind::Failed,
        Box::new(|event| {
            if let TokenEvent::Failed { error } = event {
                tracing::warn!(error = %error, "Token lifecycle error");
            }
        }),
    );

    // Initialize the lifecycle controller
    let provider = Arc::new(HttpTokenProvider::new(
        config.provider.endpoint.clone(),
        config.provider.timeout_secs,
    )?);
    let controller = Arc::new(TokenController::new(
        config.recaptcha.clone(),
        provider,
        Arc::new(FormulaEvaluator),
        emitter,
    ));

    // Spawn renewal worker
    let worker_controller = controller.clone();
    let worker_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        refresh_worker(worker_controller, worker_shutdown).await;
    });

    // Initialize application state
    let state = AppState::new(config.clone(), controller, event_log);

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Warden listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
