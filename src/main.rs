//! Holeway - collaborative wormhole map server

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use holeway::catalog::Catalog;
use holeway::config::Args;
use holeway::routes::RouteClient;
use holeway::server;
use holeway::service::MapService;
use holeway::store::MapStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("holeway={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    std::fs::create_dir_all(&args.data_dir)?;
    let store = MapStore::open(&args.data_dir)?;
    let catalog = Catalog::open(store.db())?;

    if args.is_maintenance() {
        return run_maintenance(&args, &store, &catalog);
    }

    info!("======================================");
    info!("  Holeway - wormhole map server");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Data dir: {}", args.data_dir.display());
    info!("Route API: {}", args.route_api_url);

    let routes = Arc::new(RouteClient::new(args.route_api_url.clone()));
    let service = Arc::new(MapService::new(store, catalog, routes)?);

    server::run(args.listen, service).await?;
    Ok(())
}

/// One-shot setup commands; the server does not start.
fn run_maintenance(args: &Args, store: &MapStore, catalog: &Catalog) -> anyhow::Result<()> {
    if let Some(ref path) = args.seed_catalog {
        let json = std::fs::read_to_string(path)?;
        let (systems, wh_types) = catalog.seed(&json)?;
        info!(systems, wh_types, "catalog seeded from {}", path.display());
    }

    if let Some(ref username) = args.create_user {
        let Some(ref password) = args.password else {
            // validate() already rejects this, but keep the invariant local.
            anyhow::bail!("--create-user requires --password");
        };
        store.create_user(None, username, password, args.admin)?;
        info!(user = %username, admin = args.admin, "account created");
    }

    Ok(())
}
