//! Holeway - collaborative wormhole map server
//!
//! A shared map of wormhole chains for a small group of pilots. The map is
//! a forest of trees rooted in entry systems; every mutation is validated,
//! persisted, audited and broadcast to all connected viewers over a
//! WebSocket, so everyone always sees the same document.
//!
//! ## Layout
//!
//! - [`model`] / [`tree`] - the map document and path-based tree search
//! - [`engine`] - pure mutation algorithms over the forest
//! - [`catalog`] / [`routes`] - static system data and hub-route enrichment
//! - [`store`] / [`audit`] - sled persistence, accounts, audit log
//! - [`service`] - the single-writer commit pipeline
//! - [`protocol`] / [`server`] - wire commands and the network front end

pub mod audit;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod service;
pub mod store;
pub mod tree;

pub use config::Args;
pub use error::{MapError, Result};
pub use model::Forest;
pub use service::MapService;
