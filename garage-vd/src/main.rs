//! garage-vd - Vehicle Data Aggregation Service
//!
//! Serves the garage dashboard's vehicle lookups over HTTP, or runs a single
//! lookup from the command line and prints the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garage_vd::models::AggregationRequest;
use garage_vd::services::{AggregatorSettings, VehicleDataAggregator};
use garage_vd::types::DataType;
use garage_vd::AppState;

/// Command-line arguments for garage-vd
#[derive(Parser, Debug)]
#[command(name = "garage-vd")]
#[command(about = "Vehicle data aggregation service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, global = true)]
    root_folder: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "GARAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Listen address, overriding the config file
        #[arg(short, long, env = "GARAGE_BIND_ADDRESS")]
        bind: Option<String>,
    },
    /// Look up one registration and print the result
    Lookup {
        registration: String,

        /// Comma-separated data types
        #[arg(short, long, value_delimiter = ',', default_value = "basic")]
        types: Vec<DataType>,

        /// Use the multi-package provider for technical data
        #[arg(long)]
        comprehensive: bool,

        /// Bypass the cache
        #[arg(long)]
        force_refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = garage_common::config::load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting garage-vd v{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));

    let root_folder = garage_common::config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = garage_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db = garage_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let sources = garage_vd::config::build_sources(&db, &toml_config)
        .await
        .context("Failed to configure providers")?;
    let settings = AggregatorSettings::from_config(&toml_config);
    let aggregator = Arc::new(VehicleDataAggregator::new(db.clone(), Arc::new(sources), settings));

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let addr = bind
                .or_else(|| toml_config.bind_address.clone())
                .unwrap_or_else(|| garage_vd::DEFAULT_BIND_ADDRESS.to_string());

            let toml_path = args
                .config
                .or_else(garage_common::config::find_config_file)
                .or_else(garage_common::config::user_config_path);
            let state = AppState::new(db, aggregator).with_toml_path(toml_path);
            let app = garage_vd::build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
        }
        Command::Lookup {
            registration,
            types,
            comprehensive,
            force_refresh,
        } => {
            let request = AggregationRequest::new(registration, types)
                .comprehensive(comprehensive)
                .force_refresh(force_refresh);
            let result = aggregator.aggregate(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
