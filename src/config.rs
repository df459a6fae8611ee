//! Configuration
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Holeway - collaborative wormhole map server
#[derive(Parser, Debug, Clone)]
#[command(name = "holeway")]
#[command(about = "Shared wormhole-chain map over WebSocket")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Directory holding the map database
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Base URL of the route-distance service used to annotate
    /// known-space systems with trade-hub routes
    #[arg(long, env = "ROUTE_API_URL", default_value = "http://api.eve-central.com")]
    pub route_api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Load the system/wormhole-type catalog from a JSON dump and exit
    #[arg(long, env = "SEED_CATALOG")]
    pub seed_catalog: Option<PathBuf>,

    /// Create an account and exit (requires --password)
    #[arg(long)]
    pub create_user: Option<String>,

    /// Password for --create-user
    #[arg(long)]
    pub password: Option<String>,

    /// Mark the account created by --create-user as admin
    #[arg(long, default_value = "false")]
    pub admin: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.create_user.is_some() && self.password.is_none() {
            return Err("--create-user requires --password".to_string());
        }
        Ok(())
    }

    /// True when a one-shot maintenance flag was given instead of serve mode.
    pub fn is_maintenance(&self) -> bool {
        self.seed_catalog.is_some() || self.create_user.is_some()
    }
}
