//! Error types for holeway
//!
//! Engine errors are local and non-fatal: they abort a single mutation,
//! leave the map unchanged, and are reported to the command's initiator
//! as an `ERR` message. Display strings are the wire-visible text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    /// The requested location is not in the reference catalog.
    #[error("system does not exist")]
    UnknownLocation,

    /// A node with this name already exists somewhere in the forest.
    #[error("system already exists")]
    DuplicateSystem,

    /// The `src` system to attach under does not exist.
    #[error("src system not found")]
    SourceNotFound,

    /// No node (or parent/child edge) with the given name exists.
    #[error("system not found")]
    SystemNotFound,

    #[error("sig id not found")]
    SignatureNotFound,

    #[error("invalid signature update action")]
    InvalidAction,

    #[error("user already exists")]
    DuplicateUser,

    /// A wire command that could not be parsed.
    #[error("unhandled message: {0}")]
    BadCommand(String),

    /// Upstream route lookup failed. Fatal to the single add attempt, not retried.
    #[error("route lookup failed: {0}")]
    RouteLookup(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for map operations
pub type Result<T> = std::result::Result<T, MapError>;
