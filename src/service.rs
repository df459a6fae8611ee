//! Map service
//!
//! Owns the one canonical in-memory forest and serializes every mutation:
//! read → mutate a copy → persist → swap → broadcast, all under a single
//! lock so broadcast order always matches store commit order. External
//! enrichment (catalog statics, hub routes) happens before the lock is
//! taken; uniqueness is re-checked by the engine at commit time.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::audit::{AuditEntry, MapAction};
use crate::catalog::Catalog;
use crate::engine;
use crate::error::{MapError, Result};
use crate::model::{AddRequest, EdgeFlag, Forest, Signature, System};
use crate::routes::RouteProvider;
use crate::store::MapStore;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

pub struct MapService {
    store: MapStore,
    catalog: Catalog,
    routes: Arc<dyn RouteProvider>,
    forest: Mutex<Forest>,
    updates: broadcast::Sender<String>,
}

impl MapService {
    pub fn new(store: MapStore, catalog: Catalog, routes: Arc<dyn RouteProvider>) -> Result<Self> {
        let forest = store.load_map()?;
        info!(roots = forest.roots.len(), "map loaded");
        let (updates, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Ok(Self {
            store,
            catalog,
            routes,
            forest: Mutex::new(forest),
            updates,
        })
    }

    /// Receive every snapshot committed after this call, in commit order.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    /// The current snapshot as wire JSON.
    pub async fn snapshot(&self) -> Result<String> {
        let forest = self.forest.lock().await;
        Ok(serde_json::to_string(&*forest)?)
    }

    /// Catalog name completion. Pure read, no lock on the forest.
    pub fn autocomplete(&self, prefix: &str) -> Result<Vec<String>> {
        self.catalog.autocomplete(prefix)
    }

    /// The latest audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        self.store.recent_audit(limit)
    }

    /// Run one mutation to commit: the closure works on a copy, and only a
    /// successful copy is persisted, swapped in, audited and broadcast.
    async fn apply<F>(&self, actor: &str, mutate: F) -> Result<String>
    where
        F: FnOnce(&mut Forest) -> Result<Option<MapAction>>,
    {
        let mut forest = self.forest.lock().await;
        let mut next = forest.clone();
        let action = mutate(&mut next)?;
        let json = self.store.save_map(&next)?;
        if let Some(action) = &action {
            self.store.record(actor, action)?;
        }
        *forest = next;
        // Published under the lock so viewers see commits in store order.
        let _ = self.updates.send(json.clone());
        debug!(actor, ?action, "mutation committed");
        Ok(json)
    }

    /// Resolve, enrich and insert a new system.
    pub async fn add(&self, actor: &str, request: AddRequest) -> Result<String> {
        let entry = self
            .catalog
            .get_system(&request.dest)?
            .ok_or(MapError::UnknownLocation)?;

        let mut system = System::new(entry.name.clone(), entry.region.clone(), entry.class.clone());
        if entry.is_wspace() {
            system.effect = entry.effect.clone();
            if let Some(id) = entry.static1 {
                system.static1 = self.catalog.resolve_static(id)?;
            }
            if let Some(id) = entry.static2 {
                system.static2 = self.catalog.resolve_static(id)?;
            }
        } else {
            // Slow external call, deliberately outside the forest lock.
            system.jumps = Some(self.routes.hub_routes(entry.id).await?);
        }

        let src = request.src;
        self.apply(actor, move |forest| {
            engine::add(forest, system, src.as_deref()).map(Some)
        })
        .await
    }

    pub async fn delete(&self, actor: &str, name: &str) -> Result<String> {
        self.apply(actor, |forest| engine::delete(forest, name).map(Some))
            .await
    }

    pub async fn detach(&self, actor: &str, name: &str) -> Result<String> {
        self.apply(actor, |forest| engine::detach(forest, name).map(Some))
            .await
    }

    pub async fn toggle_edge(
        &self,
        actor: &str,
        src: &str,
        dest: &str,
        flag: EdgeFlag,
    ) -> Result<String> {
        self.apply(actor, |forest| {
            engine::toggle_edge(forest, src, dest, flag).map(Some)
        })
        .await
    }

    /// Signature operations broadcast a new snapshot but write no audit
    /// entries.
    pub async fn update_signatures(
        &self,
        actor: &str,
        system: &str,
        mode: &str,
        incoming: Vec<Signature>,
    ) -> Result<String> {
        self.apply(actor, |forest| {
            engine::update_signatures(forest, system, mode, incoming).map(|_| None)
        })
        .await
    }

    pub async fn delete_signature(
        &self,
        actor: &str,
        system: &str,
        id: Option<&str>,
    ) -> Result<String> {
        self.apply(actor, |forest| {
            engine::delete_signature(forest, system, id).map(|_| None)
        })
        .await
    }

    pub async fn set_signature_note(
        &self,
        actor: &str,
        system: &str,
        id: &str,
        note: &str,
    ) -> Result<String> {
        self.apply(actor, |forest| {
            engine::set_signature_note(forest, system, id, note).map(|_| None)
        })
        .await
    }
}
