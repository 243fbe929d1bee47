use crate::document::Document;
use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::transaction::DataManager;
use crate::{Committed, Database, Snapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct WorkingCopy {
    base: u64,
    root: Arc<Snapshot>,
    dirty: bool,
    closed: bool,
}

impl WorkingCopy {
    fn open(committed: Committed) -> Self {
        Self { base: committed.serial, root: committed.root, dirty: false, closed: false }
    }

    fn resync(&mut self, committed: Committed) {
        self.base = committed.serial;
        self.root = committed.root;
        self.dirty = false;
    }
}

#[derive(Debug)]
struct ConnectionInner {
    db: Database,
    copy: Mutex<WorkingCopy>,
}

/// A view of the database isolated from every other connection until it commits.
///
/// Clones share the same working copy, so a connection can be handed to a
/// [`TransactionManager`](crate::TransactionManager) and still be used by the request.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let copy = self.inner.copy.lock();
        f.debug_struct("Connection")
            .field("storage", &self.inner.db.storage_name())
            .field("base", &copy.base)
            .field("dirty", &copy.dirty)
            .field("closed", &copy.closed)
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(db: Database, committed: Committed) -> Self {
        Self {
            inner: Arc::new(ConnectionInner { db, copy: Mutex::new(WorkingCopy::open(committed)) }),
        }
    }

    /// The root object of this connection.
    #[must_use]
    pub fn root(&self) -> Root {
        Root { conn: self.clone() }
    }

    /// Serial of the snapshot this connection is based on.
    #[must_use]
    pub fn base_serial(&self) -> u64 {
        self.inner.copy.lock().base
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.copy.lock().dirty
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.copy.lock().closed
    }

    /// Closes the connection. Uncommitted changes are discarded.
    pub fn close(&self) {
        let mut copy = self.inner.copy.lock();
        copy.closed = true;
        copy.dirty = false;
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> Result<R, DatabaseError> {
        let copy = self.inner.copy.lock();
        if copy.closed {
            return Err(DatabaseError::Closed { context: None });
        }
        Ok(f(&copy.root))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> Result<R, DatabaseError> {
        let mut copy = self.inner.copy.lock();
        if copy.closed {
            return Err(DatabaseError::Closed { context: None });
        }
        copy.dirty = true;
        Ok(f(Arc::make_mut(&mut copy.root)))
    }
}

#[async_trait]
impl DataManager for Connection {
    fn name(&self) -> &str {
        self.inner.db.storage_name()
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        let pending = {
            let copy = self.inner.copy.lock();
            if copy.closed {
                return Err(DatabaseError::Closed { context: Some("Commit".into()) });
            }
            copy.dirty.then(|| (copy.base, Arc::clone(&copy.root)))
        };

        match pending {
            Some((base, root)) => {
                let serial = self.inner.db.store(base, root).await?;
                let mut copy = self.inner.copy.lock();
                copy.base = serial;
                copy.dirty = false;
            },
            None => self.inner.copy.lock().resync(self.inner.db.latest()),
        }
        Ok(())
    }

    async fn abort(&self) -> Result<(), DatabaseError> {
        self.inner.copy.lock().resync(self.inner.db.latest());
        Ok(())
    }
}

/// Typed access to the root object of a [`Connection`].
#[derive(Debug, Clone)]
pub struct Root {
    conn: Connection,
}

impl Root {
    /// Reads and deserializes `key`.
    ///
    /// # Errors
    /// Fails when the connection is closed or the stored value has another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        let Some(value) = self.conn.read(|root| root.get(key).cloned())? else {
            return Ok(None);
        };
        serde_json::from_value(value).context(format!("Decoding `{key}`")).map(Some)
    }

    /// Raw JSON value of `key`.
    ///
    /// # Errors
    /// Fails when the connection is closed.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>, DatabaseError> {
        self.conn.read(|root| root.get(key).cloned())
    }

    /// Stores `value` under `key`, returning whether a previous value was replaced.
    ///
    /// # Errors
    /// Fails when the connection is closed or `value` cannot be serialized.
    pub fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool, DatabaseError> {
        let value = serde_json::to_value(value).context(format!("Encoding `{key}`"))?;
        self.conn.write(|root| root.insert(key.to_owned(), value).is_some())
    }

    /// Removes `key`, returning whether it existed.
    ///
    /// # Errors
    /// Fails when the connection is closed.
    pub fn remove(&self, key: &str) -> Result<bool, DatabaseError> {
        let exists = self.contains(key)?;
        if exists {
            self.conn.write(|root| root.remove(key))?;
        }
        Ok(exists)
    }

    /// # Errors
    /// Fails when the connection is closed.
    pub fn contains(&self, key: &str) -> Result<bool, DatabaseError> {
        self.conn.read(|root| root.contains_key(key))
    }

    /// # Errors
    /// Fails when the connection is closed.
    pub fn keys(&self) -> Result<Vec<String>, DatabaseError> {
        self.conn.read(|root| root.keys().cloned().collect())
    }

    /// Returns the value of `key`, storing `init()` first when it is missing.
    ///
    /// # Errors
    /// Fails when the connection is closed or the value cannot be converted.
    pub fn get_or_insert_with<T, F>(&self, key: &str, init: F) -> Result<T, DatabaseError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get(key)? {
            return Ok(existing);
        }
        let value = init();
        self.insert(key, &value)?;
        Ok(value)
    }

    /// Applies `f` to the value of `key` (or its default) and stores the result.
    ///
    /// # Errors
    /// Fails when the connection is closed or the value cannot be converted.
    pub fn update<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, DatabaseError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let mut value: T = self.get(key)?.unwrap_or_default();
        let out = f(&mut value);
        self.insert(key, &value)?;
        Ok(out)
    }

    /// Loads a typed document, falling back to its default.
    ///
    /// # Errors
    /// Fails when the connection is closed or the stored value has another shape.
    pub fn document<D: Document>(&self) -> Result<D, DatabaseError> {
        Ok(self.get(D::KEY)?.unwrap_or_default())
    }

    /// Stores a typed document under its key.
    ///
    /// # Errors
    /// Fails when the connection is closed or the document cannot be serialized.
    pub fn save<D: Document>(&self, document: &D) -> Result<(), DatabaseError> {
        self.insert(D::KEY, document).map(|_| ())
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
