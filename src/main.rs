//! Bank ledger server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Client  │───▶│ Gateway  │───▶│ Transfer │───▶│  Store   │
//! │  (HTTP)  │    │(axum+JWT)│    │  Engine  │    │(PG / mem)│
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use bank_ledger::account::{AccountStore, MemoryAccountStore, PgAccountStore};
use bank_ledger::config::{AppConfig, StoreBackend};
use bank_ledger::db::Database;
use bank_ledger::gateway::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "bank_ledger", version, about = "Minimal banking ledger over HTTP")]
struct Args {
    /// Configuration environment, loads config/<env>.yaml
    #[arg(short, long, default_value = "dev")]
    env: String,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Create the accounts table and exit
    #[arg(long)]
    init_schema: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(&args.env)?;
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    let _log_guard = bank_ledger::logging::init_logging(&config)?;

    tracing::info!(
        env = %args.env,
        version = env!("GIT_HASH"),
        backend = ?config.store.backend,
        "Starting bank ledger"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> anyhow::Result<()> {
    let store: Arc<dyn AccountStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&config.store)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema()
                .await
                .context("Failed to initialize schema")?;
            if args.init_schema {
                tracing::info!("Schema initialized");
                return Ok(());
            }
            Arc::new(PgAccountStore::from_database(
                &db,
                config.store.lock_timeout(),
            ))
        }
        StoreBackend::Memory => {
            if args.init_schema {
                anyhow::bail!("--init-schema requires the postgres backend");
            }
            tracing::warn!("Using the in-memory store; balances are lost on exit");
            Arc::new(MemoryAccountStore::new(config.store.lock_timeout()))
        }
    };

    let state = AppState::new(store, &config).context("Invalid accounts configuration")?;
    gateway::run_server(&config.gateway, Arc::new(state)).await
}
