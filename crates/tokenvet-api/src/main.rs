//! tokenvet server binary
//!
//! Bearer-token verification service with a paced batch pipeline.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! tokenvet --config config.yaml
//!
//! # With environment variables only
//! TOKENVET_SERVER__PORT=8080 tokenvet
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};

use tokenvet_api::http::{create_router, AppState};
use tokenvet_api::observability::{init_logging, LoggingConfig};
use tokenvet_server::handlers::batch::BatchPolicy;
use tokenvet_server::{ServerConfig, UpstreamVerifier, WebhookAuditSink};
use tokenvet_storage::MemoryRecordStore;

/// tokenvet - bearer-token verification service
#[derive(Parser, Debug)]
#[command(name = "tokenvet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig {
        json_format: config.logging.json,
        default_level: parse_log_level(&config.logging.level),
        include_spans: false,
    });

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tokenvet server");

    // Wire the pipeline: upstream verifier, in-memory store, audit sink.
    // The store is constructed here and lives exactly as long as the
    // process - no module-level singleton.
    let verifier = Arc::new(UpstreamVerifier::from_settings(&config.upstream)?);
    let store = MemoryRecordStore::new_shared();
    let audit = Arc::new(WebhookAuditSink::from_settings(&config.audit)?);

    if config.audit.webhook_url.is_some() {
        info!("Audit webhook forwarding enabled");
    } else {
        info!("Audit webhook not configured, events stay local");
    }

    let state = AppState::new(verifier, store, audit, BatchPolicy::from(&config.batch));
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Parse log level from string.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Level::TRACE);
        assert_eq!(parse_log_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_log_level("Info"), Level::INFO);
        assert_eq!(parse_log_level("unknown"), Level::INFO);
    }

    #[test]
    fn test_cli_args_parsing() {
        let args = Args::try_parse_from(["tokenvet"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["tokenvet", "--config", "config.yaml"]).unwrap();
        assert_eq!(args.config, Some("config.yaml".to_string()));

        let args = Args::try_parse_from(["tokenvet", "-c", "test.yaml"]).unwrap();
        assert_eq!(args.config, Some("test.yaml".to_string()));
    }
}
