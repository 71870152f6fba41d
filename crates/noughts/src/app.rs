//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic health reporting and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_signal_silent},
};
use game_server::{GameServer, ServerStats};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often the health line is logged.
const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on waiting for the accept loop after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(8);

/// Main application struct.
///
/// Owns the merged configuration and the game server for the lifetime of
/// the process.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Game server instance
    server: Arc<GameServer>,
}

/// Reads the configuration file once and folds in the CLI overrides.
///
/// # Process
///
/// 1. Load configuration from file (creating default if missing)
/// 2. Apply command-line argument overrides
/// 3. Validate merged configuration
///
/// Runs before logging exists, so failures are returned rather than logged.
pub async fn load_config(args: &CliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .map_err(|e| format!("Failed to load {}: {e}", args.config_path.display()))?;
    apply_overrides(&mut config, args);

    if let Err(e) = config.validate() {
        return Err(format!("Configuration validation failed: {e}").into());
    }
    Ok(config)
}

impl Application {
    /// Creates a new application instance from a merged, validated configuration.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server = Arc::new(GameServer::new(config.to_server_config()?));
        Ok(Self { config, server })
    }

    /// Runs the server until a termination signal arrives.
    ///
    /// The listener is bound before this returns control to the runtime, so a
    /// bad bind address fails fast. A second signal during shutdown exits the
    /// process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting noughts server");
        self.log_configuration_summary();

        let listener = self.server.bind().await?;

        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                match server.serve(listener).await {
                    Ok(()) => info!("✅ Server completed successfully"),
                    Err(e) => error!("❌ Server error: {:?}", e),
                }
            })
        };

        let monitoring_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEALTH_INTERVAL);
                // First tick completes immediately.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    log_health(&server.stats().await);
                }
            })
        };

        info!("✅ Noughts server is now running!");
        info!("🎮 Ready to accept connections on {}", self.config.server.bind_address);
        info!("🔍 Health monitoring active - stats every {} seconds", HEALTH_INTERVAL.as_secs());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        wait_for_shutdown_signal().await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        monitoring_handle.abort();
        self.server.shutdown().await?;

        info!("⏳ Waiting for server task to complete gracefully...");
        match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
            Ok(_) => info!("✅ Server task completed gracefully"),
            Err(_) => warn!("⏰ Server task did not complete within timeout, proceeding"),
        }

        let final_stats = self.server.stats().await;
        info!("📊 Final Statistics:");
        log_health(&final_stats);

        info!("✅ Noughts server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let server = &self.config.server;
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", server.bind_address);
        info!(
            "  👥 Max connections: {} ({} per IP)",
            server.max_connections, server.max_connections_per_ip
        );
        info!("  ⏱️ Hello timeout: {}s", server.connection_timeout);
        info!("  🎲 Auto-start matches: {}", server.auto_start);
        info!(
            "  🔑 Admin intents: {}",
            if server.admin_token.is_some() { "enabled" } else { "disabled" }
        );
    }
}

/// Folds command-line overrides into the file configuration.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(bind_address) = &args.bind_address {
        config.server.bind_address = bind_address.clone();
    }

    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }

    if let Some(max_connections) = args.max_connections {
        config.server.max_connections = max_connections;
    }

    if args.json_logs {
        config.logging.json_format = true;
    }
}

fn log_health(stats: &ServerStats) {
    info!(
        "📊 System Health - {} connections | {} sessions | {} rooms ({} open) | {} active matches",
        stats.connections,
        stats.lobby.sessions,
        stats.lobby.rooms,
        stats.lobby.open_rooms,
        stats.lobby.active_matches
    );
}
