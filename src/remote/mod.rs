//! Remote persistence contract consumed by the store and the gateway.
//!
//! The service owns record identity: it assigns ids, stamps timestamps and
//! scopes every read and write to the calling actor. Two backends ship with
//! the crate: [`MemoryRemote`] for tests and demos, and [`SqliteRemote`] for
//! the CLI.

mod memory;
mod sqlite;

pub use memory::{MemoryRemote, RemoteOp};
pub use sqlite::SqliteRemote;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::{Actor, Origin, Record};

/// Maximum number of records returned by a list call unless configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Business-rule rejection carrying the server's reason.
    #[error("{0}")]
    Rejected(String),

    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RemoteError {
    /// Reason suitable for showing to a user, if the service supplied one.
    pub fn reason(&self) -> Option<String> {
        match self {
            RemoteError::Rejected(reason) | RemoteError::Unavailable(reason)
                if !reason.trim().is_empty() =>
            {
                Some(reason.clone())
            }
            RemoteError::NotFound(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Storage(e.to_string())
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Read query for a collection. Rows come back newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: usize,
    pub include_deleted: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            include_deleted: false,
        }
    }
}

impl ListQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// How a delete is applied by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Stamp `deleted_at`; the row stays but is excluded from reads.
    #[default]
    Soft,
    /// Remove the row.
    Hard,
}

impl std::fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteMode::Soft => write!(f, "soft"),
            DeleteMode::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for DeleteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(DeleteMode::Soft),
            "hard" => Ok(DeleteMode::Hard),
            _ => Err(format!("Invalid delete mode: {}", s)),
        }
    }
}

#[async_trait]
pub trait RemoteService<R: Record>: Send + Sync {
    /// Non-deleted records owned by `actor`, `created_at` descending.
    async fn list(&self, actor: &Actor, query: &ListQuery) -> RemoteResult<Vec<R>>;

    /// Persist a new record and return its canonical form.
    async fn insert(&self, actor: &Actor, record: R) -> RemoteResult<R>;

    /// Replace the fields of an existing record and return its canonical form.
    async fn update(&self, actor: &Actor, record: R) -> RemoteResult<R>;

    /// Delete a record and the rows of its dependent collections.
    async fn delete(&self, actor: &Actor, id: Uuid, mode: DeleteMode) -> RemoteResult<()>;
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Server-side stamping of a record being inserted.
pub(crate) fn stamp_insert<R: Record>(record: &mut R, actor: &Actor, now: DateTime<Utc>) {
    let base = record.base_mut();
    base.id = Uuid::new_v4();
    base.created_at = now;
    base.updated_at = now;
    base.deleted_at = None;
    base.created_by = Some(actor.id.clone());
    base.origin = Origin::Live;
}

/// Server-side stamping of an update against the stored copy. Identity and
/// ownership always come from the stored row.
pub(crate) fn stamp_update<R: Record>(record: &mut R, stored: &R, now: DateTime<Utc>) {
    let stored = stored.base();
    let base = record.base_mut();
    base.id = stored.id;
    base.created_at = stored.created_at;
    base.created_by = stored.created_by.clone();
    base.updated_at = now.max(stored.updated_at);
    base.deleted_at = None;
    base.origin = Origin::Live;
}
