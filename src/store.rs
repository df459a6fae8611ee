//! Map tree store
//!
//! sled-backed persistence for the single map document, the append-only
//! audit log, and account records. The map is written wholesale as one
//! JSON snapshot after every committed mutation; audit entries are keyed
//! by a monotonic id so same-second writes never collide.

use std::path::Path;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::{AuditEntry, MapAction};
use crate::error::{MapError, Result};
use crate::model::Forest;

const MAP_KEY: &[u8] = b"map";

/// A stored account. Full session handling lives outside the core; the
/// engine only ever sees the username as the actor of a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip)]
    pub username: String,
    pub password_hash: String,
    pub admin: bool,
}

pub struct MapStore {
    db: sled::Db,
    maps: sled::Tree,
    users: sled::Tree,
    log: sled::Tree,
}

impl MapStore {
    /// Open or create the store under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("map.sled");
        info!(path = %path.display(), "opening map store");
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway in-memory-backed store (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let maps = db.open_tree("maps")?;
        let users = db.open_tree("users")?;
        let log = db.open_tree("log")?;
        Ok(Self { db, maps, users, log })
    }

    /// The underlying database, shared with the reference catalog trees.
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Load the map document, creating an empty one on first run.
    pub fn load_map(&self) -> Result<Forest> {
        match self.maps.get(MAP_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                debug!("no map document yet, starting empty");
                Ok(Forest::default())
            }
        }
    }

    /// Persist a full snapshot and return its wire JSON.
    pub fn save_map(&self, forest: &Forest) -> Result<String> {
        let json = serde_json::to_string(forest)?;
        self.maps.insert(MAP_KEY, json.as_bytes())?;
        self.maps.flush()?;
        Ok(json)
    }

    /// Append the audit entries for a committed action.
    pub fn record(&self, actor: &str, action: &MapAction) -> Result<()> {
        for message in action.messages() {
            self.append_audit(actor, &message)?;
        }
        Ok(())
    }

    pub fn append_audit(&self, actor: &str, message: &str) -> Result<()> {
        let entry = AuditEntry {
            time: Utc::now(),
            actor: actor.to_string(),
            message: message.to_string(),
        };
        let id = self.db.generate_id()?;
        self.log.insert(id.to_be_bytes(), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    /// The latest audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut entries = Vec::with_capacity(limit);
        for item in self.log.iter().rev().take(limit) {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    /// Create an account. When `actor` is given the creation is audited.
    pub fn create_user(
        &self,
        actor: Option<&str>,
        username: &str,
        password: &str,
        admin: bool,
    ) -> Result<()> {
        if self.users.contains_key(username.as_bytes())? {
            return Err(MapError::DuplicateUser);
        }
        let account = Account {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            admin,
        };
        self.users
            .insert(username.as_bytes(), serde_json::to_vec(&account)?)?;
        self.users.flush()?;
        if let Some(actor) = actor {
            self.record(
                actor,
                &MapAction::UserCreated {
                    username: username.to_string(),
                },
            )?;
        }
        Ok(())
    }

    pub fn get_user(&self, username: &str) -> Result<Option<Account>> {
        match self.users.get(username.as_bytes())? {
            Some(bytes) => {
                let mut account: Account = serde_json::from_slice(&bytes)?;
                account.username = username.to_string();
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Check a login. Returns the account when the password matches.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Option<Account>> {
        match self.get_user(username)? {
            Some(account) if verify_password(password, &account.password_hash)? => {
                Ok(Some(account))
            }
            _ => Ok(None),
        }
    }

    /// Change a password after verifying the old one. Returns false when
    /// the account is missing or the old password does not match.
    pub fn change_password(&self, username: &str, old: &str, new: &str) -> Result<bool> {
        let Some(mut account) = self.verify_login(username, old)? else {
            return Ok(false);
        };
        account.password_hash = hash_password(new)?;
        self.users
            .insert(username.as_bytes(), serde_json::to_vec(&account)?)?;
        self.users.flush()?;
        Ok(true)
    }

    pub fn delete_user(&self, username: &str) -> Result<()> {
        self.users.remove(username.as_bytes())?;
        Ok(())
    }

    /// All accounts as (username, admin) pairs, in key order.
    pub fn list_users(&self) -> Result<Vec<(String, bool)>> {
        let mut users = Vec::new();
        for item in self.users.iter() {
            let (key, value) = item?;
            let account: Account = serde_json::from_slice(&value)?;
            users.push((String::from_utf8_lossy(&key).into_owned(), account.admin));
        }
        Ok(users)
    }
}

/// Hash a password using Argon2id. Returns the PHC-formatted hash string
/// that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MapError::Auth(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| MapError::Auth(format!("invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
