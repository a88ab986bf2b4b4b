//! Command-line interface.
//!
//! `serve` boots the storage engine, registry, and object store, then runs
//! the HTTP server until interrupted.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::cache::CacheConfig;
use crate::config::Settings;
use crate::engine::StorageEngine;
use crate::registry::TypeRegistry;
use crate::rest_api::{self, AppState};
use crate::store::ObjectStore;

/// Runtime-typed, versioned record registry.
#[derive(Debug, Parser)]
#[command(name = "regidb", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Parses arguments and dispatches to the selected command.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regidb=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { host, port } => {
            let mut settings = Settings::from_env();
            if let Some(host) = host {
                settings.http.host = host;
            }
            if let Some(port) = port {
                settings.http.port = port;
            }
            serve(settings).await
        }
    }
}

/// Wires subsystems and serves until shutdown.
async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let engine = StorageEngine::new();
    let registry = Arc::new(TypeRegistry::new(
        engine.clone(),
        CacheConfig::from(&settings.cache),
    )?);
    let store = ObjectStore::new(engine, Arc::clone(&registry));

    let app = rest_api::router(AppState { registry, store }, &settings);
    let addr = settings.http.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
