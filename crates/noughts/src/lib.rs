//! # Noughts Server - Main Entry Point
//!
//! Application shell around the [`game_server`] gateway: CLI parsing,
//! configuration loading, logging and lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! noughts
//!
//! # Specify custom configuration
//! noughts --config production.toml
//!
//! # Override specific settings
//! noughts --bind 0.0.0.0:8080 --max-connections 200 --log-level debug
//!
//! # JSON logging for production
//! noughts --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM. A second
//! signal exits immediately.

use tracing::{error, info};

mod app;
mod cli;
pub mod config;
mod logging;
pub mod signals;

use app::{load_config, Application};
use cli::CliArgs;

/// Runs the server process from argument parsing to shutdown.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from the binary's `#[tokio::main]`, so it must not start a runtime
/// of its own.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Loaded once, before logging exists, so failures go to stderr.
    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }
    info!("🔧 Configuration loaded from: {}", args.config_path.display());

    match Application::new(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{LoggingSettings, SecuritySettings, ServerSettings};
