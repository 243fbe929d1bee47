//! # Database
//!
//! A small document database for Ramverk applications. The whole database is one JSON object
//! (the *root*) persisted as a single record of a [`Storage`]. Every [`Connection`] works on a
//! private copy of the root taken when it was opened and writes back with compare-and-swap on
//! that snapshot's serial, so concurrent requests never observe each other's uncommitted
//! changes and the loser of a race gets a conflict instead of a lost update.
//!
//! Connections are plain [`DataManager`]s: a request-scoped [`TransactionManager`] commits or
//! aborts every manager joined to it.
//!
//! ## Example
//!
//! ```rust
//! use ramverk_database::{Database, DatabaseError, TransactionManager};
//! use ramverk_storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::open(Arc::new(MemoryStorage::new())).await?;
//!
//!     let tx = TransactionManager::new();
//!     tx.begin().await?;
//!     let conn = db.open_connection();
//!     tx.join(Arc::new(conn.clone()))?;
//!
//!     conn.root().insert("greeting", &"Hello")?;
//!     tx.commit().await?;
//!
//!     let greeting: Option<String> = db.open_connection().root().get("greeting")?;
//!     assert_eq!(greeting.as_deref(), Some("Hello"));
//!     Ok(())
//! }
//! ```

mod connection;
mod document;
mod error;
mod transaction;

pub use connection::{Connection, Root};
pub use document::Document;
pub use error::{DatabaseError, DatabaseErrorExt};
pub use transaction::{DataManager, Status, TransactionManager};

use parking_lot::RwLock;
use ramverk_storage::{EMPTY_SERIAL, Storage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info};

/// The database root: top-level keys mapped to JSON values.
pub type Snapshot = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub(crate) struct Committed {
    pub(crate) serial: u64,
    pub(crate) root: Arc<Snapshot>,
}

/// Inner state of the [`Database`] handle.
#[derive(Debug)]
pub struct DatabaseInner {
    storage: Arc<dyn Storage>,
    latest: RwLock<Committed>,
}

/// Handle to an opened database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Deref for Database {
    type Target = DatabaseInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Database {
    /// Opens the database stored in `storage`, starting empty when nothing was stored yet.
    ///
    /// # Errors
    /// Returns [`DatabaseError::Storage`] if the record cannot be read and
    /// [`DatabaseError::Serialization`] if it is not a JSON object.
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, DatabaseError> {
        let latest = Self::read_latest(storage.as_ref()).await?;
        info!(storage = storage.name(), serial = latest.serial, "Opened database");

        Ok(Self { inner: Arc::new(DatabaseInner { storage, latest: RwLock::new(latest) }) })
    }

    /// Opens a connection on the latest committed snapshot.
    #[must_use]
    pub fn open_connection(&self) -> Connection {
        Connection::new(self.clone(), self.latest())
    }

    /// Serial of the latest committed snapshot, `0` for an empty database.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.latest.read().serial
    }

    #[must_use]
    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    /// Reloads the latest record, picking up writes made through another handle.
    ///
    /// # Errors
    /// Same as [`Database::open`].
    pub async fn refresh(&self) -> Result<u64, DatabaseError> {
        let fresh = Self::read_latest(self.storage.as_ref()).await?;
        let serial = fresh.serial;
        self.publish(fresh);
        Ok(serial)
    }

    pub(crate) fn latest(&self) -> Committed {
        self.latest.read().clone()
    }

    /// Writes `root` as the successor of `base`.
    pub(crate) async fn store(&self, base: u64, root: Arc<Snapshot>) -> Result<u64, DatabaseError> {
        let bytes = serde_json::to_vec(root.as_ref()).context("Encoding snapshot")?;
        let serial = self.storage.store(base, bytes).await.context("Committing snapshot")?;
        debug!(storage = self.storage.name(), serial, "Snapshot committed");

        self.publish(Committed { serial, root });
        Ok(serial)
    }

    fn publish(&self, committed: Committed) {
        let mut latest = self.latest.write();
        if committed.serial >= latest.serial {
            *latest = committed;
        }
    }

    async fn read_latest(storage: &dyn Storage) -> Result<Committed, DatabaseError> {
        let Some(record) = storage.load().await.context("Loading snapshot")? else {
            return Ok(Committed { serial: EMPTY_SERIAL, root: Arc::default() });
        };
        let root: Snapshot = serde_json::from_slice(&record.data).context("Decoding snapshot")?;
        Ok(Committed { serial: record.serial, root: Arc::new(root) })
    }
}
