//! Reference catalog
//!
//! Read-only (at serve time) lookup from a location name to its static
//! attributes: region, security class, and for wormhole-class systems the
//! effect and static wormhole types. Seeded once from a JSON dump, then
//! only queried by the engine.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::model::WormholeStatic;

/// Solar system ids above this are wormhole space.
pub const WSPACE_ID_FLOOR: u32 = 31_000_000;

/// Static attributes of a known location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSystem {
    pub id: u32,
    pub name: String,
    pub region: String,
    pub class: String,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub static1: Option<u32>,
    #[serde(default)]
    pub static2: Option<u32>,
}

impl CatalogSystem {
    pub fn is_wspace(&self) -> bool {
        self.id > WSPACE_ID_FLOOR
    }
}

/// A wormhole type record, referenced by id from [`CatalogSystem`] statics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WormholeType {
    pub id: u32,
    pub name: String,
    /// Source class the hole spawns in.
    pub src: String,
    /// Destination class it leads to.
    pub dest: String,
    /// Maximum lifetime in hours.
    pub lifetime: u32,
    /// Per-jump mass limit in kg.
    pub jump_mass: u64,
    /// Total mass budget in kg.
    pub max_mass: u64,
}

impl WormholeType {
    /// The record copied onto a map node at add time.
    pub fn to_static(&self) -> WormholeStatic {
        WormholeStatic {
            name: self.name.clone(),
            dest: self.dest.clone(),
            lifetime: self.lifetime,
            jump_mass: self.jump_mass,
            max_mass: self.max_mass,
        }
    }
}

/// Seed file layout for `--seed-catalog`.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub systems: Vec<CatalogSystem>,
    #[serde(default)]
    pub wormhole_types: Vec<WormholeType>,
}

pub struct Catalog {
    systems: sled::Tree,
    wh_types: sled::Tree,
}

impl Catalog {
    /// Open the catalog trees on a shared database.
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            systems: db.open_tree("catalog-systems")?,
            wh_types: db.open_tree("catalog-whtypes")?,
        })
    }

    pub fn insert_system(&self, system: &CatalogSystem) -> Result<()> {
        self.systems
            .insert(system.name.as_bytes(), serde_json::to_vec(system)?)?;
        Ok(())
    }

    pub fn get_system(&self, name: &str) -> Result<Option<CatalogSystem>> {
        match self.systems.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn insert_wh_type(&self, wh_type: &WormholeType) -> Result<()> {
        self.wh_types
            .insert(wh_type.id.to_be_bytes(), serde_json::to_vec(wh_type)?)?;
        Ok(())
    }

    pub fn get_wh_type(&self, id: u32) -> Result<Option<WormholeType>> {
        match self.wh_types.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Resolve a static reference to the full record copied onto nodes.
    pub fn resolve_static(&self, id: u32) -> Result<Option<WormholeStatic>> {
        Ok(self.get_wh_type(id)?.map(|wh| wh.to_static()))
    }

    /// All catalog names sharing the title-cased prefix, in key order.
    pub fn autocomplete(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = title_case(prefix);
        let mut names = Vec::new();
        for item in self.systems.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            names.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(names)
    }

    /// Load systems and wormhole types from a seed dump.
    pub fn seed(&self, json: &str) -> Result<(usize, usize)> {
        let seed: SeedFile = serde_json::from_str(json)?;
        for system in &seed.systems {
            self.insert_system(system)?;
        }
        for wh_type in &seed.wormhole_types {
            self.insert_wh_type(wh_type)?;
        }
        self.systems.flush()?;
        self.wh_types.flush()?;
        info!(
            systems = seed.systems.len(),
            wormhole_types = seed.wormhole_types.len(),
            "catalog seeded"
        );
        Ok((seed.systems.len(), seed.wormhole_types.len()))
    }
}

/// Uppercase every letter that follows a non-letter, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if boundary {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(c);
            boundary = true;
        }
    }
    out
}
