//! Main entry point for the quizmatch matchmaking service
//!
//! This is the production entry point that initializes and runs the
//! matchmaking engine with proper error handling, logging, and graceful
//! shutdown.

use anyhow::Result;
use clap::Parser;
use quizmatch::config::AppConfig;
use quizmatch::service::app::Collaborators;
use quizmatch::service::AppState;
use std::path::PathBuf;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info};

/// Quizmatch - real-time skill-based matchmaking for competitive quizzes
#[derive(Parser)]
#[command(
    name = "quizmatch",
    version,
    about = "Real-time skill-based matchmaking engine for competitive quiz matches",
    long_about = "Quizmatch pairs players of comparable skill for head-to-head quiz matches. \
                 Players connect over a persistent WebSocket, queue for a subject, and are \
                 paired by closest rating within a window that relaxes the longer they wait."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Port override
    #[arg(short, long, value_name = "PORT", help = "Override server port")]
    port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🎯 Quizmatch Matchmaking Engine");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Listening: {}:{}",
        config.service.host, config.service.port
    );
    info!("   Subjects: {}", config.subjects.len());
    info!(
        "   Rating window: ±{} → ±{} (step {} every {}ms)",
        config.matchmaking.initial_range,
        config.matchmaking.max_range,
        config.matchmaking.range_expansion_step,
        config.matchmaking.expansion_interval_ms
    );
    info!("   Queue timeout: {}ms", config.matchmaking.queue_timeout_ms);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    // Start with environment-based config
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.service.port = port;
    }

    Ok(config)
}

/// Periodically log a one-line operational summary
async fn status_task(app_state: std::sync::Arc<tokio::sync::Mutex<AppState>>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    interval.tick().await;

    loop {
        interval.tick().await;
        let state = app_state.lock().await;
        if !state.is_running().await {
            break;
        }
        info!("Status: {}", state.status_line());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    // Display startup information
    display_startup_banner(&config);

    // Initialize application state
    info!("Initializing service components...");
    let collaborators = Collaborators::in_memory(&config);
    let mut app_state = match AppState::new(config, collaborators) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // Start the service
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let app_state = std::sync::Arc::new(tokio::sync::Mutex::new(app_state));

    // Periodic status logging
    let status_handle = {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            status_task(app_state).await;
        })
    };

    info!("✅ Quizmatch Matchmaking Engine is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    // Wait for shutdown signal
    wait_for_shutdown_signal().await;

    // Begin graceful shutdown
    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    status_handle.abort();

    if let Err(e) = app_state.lock().await.shutdown().await {
        error!("Shutdown error: {}", e);
        std::process::exit(1);
    }

    info!("🛑 Quizmatch Matchmaking Engine stopped");
    Ok(())
}
