//! Knockout tournament server.
//!
//! Serves the bracket engine over HTTP on top of PostgreSQL or an in-memory
//! store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use knockout::{
    BracketManager, Draw,
    db::{BracketStore, Database, MemoryBracketStore},
};
use ko_server::{
    api,
    config::{Overrides, ServerConfig, StorageBackend},
    logging, metrics,
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run a single-elimination tournament server

USAGE:
  ko_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep all data in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          postgres | memory
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus listener address (disabled when unset)
  DRAW_SEED                Fixed seed for reproducible bracket draws
  RUST_LOG                 Log filter
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).context("Failed to install Prometheus exporter")?;
        info!("Metrics available at http://{}/metrics", addr);
    }

    let store: Arc<dyn BracketStore> = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryBracketStore::new())
        }
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            Arc::new(db.store())
        }
    };

    let draw = match config.draw_seed {
        Some(seed) => {
            info!("Using fixed draw seed {}", seed);
            Draw::seeded(seed)
        }
        None => Draw::random(),
    };

    let app = api::create_router(api::AppState {
        manager: BracketManager::with_draw(store, draw),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
