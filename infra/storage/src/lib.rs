//! Record storages backing the Ramverk database.
//!
//! A storage keeps exactly one record: the latest committed snapshot of a database, tagged with
//! a monotonically increasing serial. Writers must name the serial they started from, which
//! turns every write into a compare-and-swap and lets concurrent transactions detect conflicts.
//!
//! # Implementations
//!
//! - **[`MemoryStorage`]**: volatile, for tests and demos.
//! - **[`FileStorage`]**: a single sandboxed file written with the atomic swap pattern (unique
//!   temp write + `fsync` + `rename`), optionally LZ4 compressed. Orphaned temporary files are
//!   purged when the storage is opened.
//!
//! # Examples
//!
//! ```rust
//! use ramverk_storage::{Compression, FileStorage, Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let storage = FileStorage::builder()
//!         .root(tmp.path())
//!         .file("app.db")
//!         .compression(Compression::Lz4)
//!         .open()
//!         .await?;
//!
//!     let serial = storage.store(0, b"snapshot".to_vec()).await?;
//!     let record = storage.load().await?.expect("record was stored");
//!     assert_eq!(record.serial, serial);
//!     assert_eq!(record.data, b"snapshot");
//!
//!     // A second writer that started from the empty storage loses.
//!     assert!(storage.store(0, b"stale".to_vec()).await.unwrap_err().is_conflict());
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod file;
mod maintenance;
mod memory;
mod security;

pub use builder::FileStorageBuilder;
pub use error::{StorageError, StorageErrorExt};
pub use file::{Compression, FileStorage};
pub use memory::MemoryStorage;

use async_trait::async_trait;
use std::fmt::Debug;

/// Serial of a storage that holds no record yet.
pub const EMPTY_SERIAL: u64 = 0;

/// The latest stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub serial: u64,
    pub data: Vec<u8>,
}

/// Single-record storage with optimistic concurrency.
#[async_trait]
pub trait Storage: Debug + Send + Sync + 'static {
    /// Human readable name used in logs.
    fn name(&self) -> &str;

    /// Loads the latest record, `None` when nothing was ever stored.
    ///
    /// # Errors
    /// Returns an error when the backing medium cannot be read or is corrupted.
    async fn load(&self) -> Result<Option<Record>, StorageError>;

    /// Replaces the record if the current serial equals `expected` and returns the new serial.
    ///
    /// # Errors
    /// Returns [`StorageError::Conflict`] when another writer stored first.
    async fn store(&self, expected: u64, data: Vec<u8>) -> Result<u64, StorageError>;
}

pub(crate) fn check_serial(expected: u64, actual: u64) -> Result<u64, StorageError> {
    if expected == actual {
        Ok(actual + 1)
    } else {
        Err(StorageError::Conflict { expected, actual, context: None })
    }
}
