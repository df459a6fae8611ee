//! Route enrichment
//!
//! Known-space systems get routes to the fixed trade-hub set attached at
//! add time. The lookup is an external HTTP service; it runs before the
//! forest lock is taken so a slow upstream call never stalls viewers.
//! Failures abort the single add attempt and are not retried.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{MapError, Result};
use crate::model::Hop;

/// The well-known hubs every known-space node gets routes to.
pub const TRADE_HUBS: [(&str, u32); 4] = [
    ("Jita", 30_000_142),
    ("Amarr", 30_002_187),
    ("Dodixie", 30_002_659),
    ("Rens", 30_002_510),
];

/// Seam for the external route-distance service.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Routes from `system_id` to every trade hub, keyed by hub name.
    async fn hub_routes(&self, system_id: u32) -> Result<BTreeMap<String, Vec<Hop>>>;
}

/// HTTP client for a route API shaped like
/// `GET {base}/api/route/from/{from}/to/{to}` returning a JSON hop list.
pub struct RouteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RouteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    to: RouteEndpoint,
}

#[derive(Debug, Deserialize)]
struct RouteEndpoint {
    name: String,
    security: f64,
}

#[async_trait]
impl RouteProvider for RouteClient {
    async fn hub_routes(&self, system_id: u32) -> Result<BTreeMap<String, Vec<Hop>>> {
        let mut jumps = BTreeMap::new();
        for (hub, hub_id) in TRADE_HUBS {
            let url = format!(
                "{}/api/route/from/{}/to/{}",
                self.base_url, system_id, hub_id
            );
            debug!(%url, "fetching hub route");
            let legs: Vec<RouteLeg> = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| MapError::RouteLookup(e.to_string()))?
                .error_for_status()
                .map_err(|e| MapError::RouteLookup(e.to_string()))?
                .json()
                .await
                .map_err(|e| MapError::RouteLookup(e.to_string()))?;
            let hops = legs
                .into_iter()
                .map(|leg| Hop {
                    name: leg.to.name,
                    security: leg.to.security,
                })
                .collect();
            jumps.insert(hub.to_string(), hops);
        }
        Ok(jumps)
    }
}
