use crate::error::{PersistenceError, PersistenceErrorExt};
use crate::transaction::Transactions;
use async_trait::async_trait;
use parking_lot::Mutex;
use ramverk_database::{Connection, Database, Document, Root};
use ramverk_kernel::{Component, Environment, Error, FromEnvironment, Outcome};
use ramverk_storage::Storage;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// The connection of one request, opened on first use.
#[derive(Debug)]
struct RequestConnection {
    db: Database,
    conn: Mutex<Option<Connection>>,
}

impl RequestConnection {
    fn get(&self, env: &Environment) -> Result<Connection, PersistenceError> {
        let mut slot = self.conn.lock();
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        env.log().info("connecting database");
        let conn = self.db.open_connection();
        if let Some(manager) = Transactions::current(env).filter(|m| m.is_active()) {
            manager.join(Arc::new(conn.clone())).context("Joining transaction")?;
        }
        *slot = Some(conn.clone());
        Ok(conn)
    }

    fn take(&self) -> Option<Connection> {
        self.conn.lock().take()
    }
}

/// Gives requests a connection to a [`Database`].
///
/// Connections join the request transaction, so install [`Transactions`] after this
/// component to have changes committed.
#[derive(Debug, Clone)]
pub struct Persistence {
    db: Database,
}

impl Persistence {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database stored in `storage`.
    ///
    /// # Errors
    /// See [`Database::open`].
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, PersistenceError> {
        let db = Database::open(storage).await.context("Opening database")?;
        Ok(Self::new(db))
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// The connection of the current request, opened and joined to the transaction on
    /// first use.
    ///
    /// # Errors
    /// Fails when the component is not installed or the transaction cannot be joined.
    pub fn connection(env: &Environment) -> Result<Connection, PersistenceError> {
        let request = env
            .local()
            .get::<RequestConnection>()
            .ok_or_else(|| PersistenceError::from("Persistence component is not installed"))?;
        request.get(env)
    }

    /// # Errors
    /// See [`Persistence::connection`].
    pub fn root(env: &Environment) -> Result<Root, PersistenceError> {
        Self::connection(env).map(|conn| conn.root())
    }
}

#[async_trait]
impl Component for Persistence {
    fn name(&self) -> &'static str {
        "persistence"
    }

    async fn enter(&self, env: &Environment) -> Result<(), Error> {
        env.local().insert(RequestConnection { db: self.db.clone(), conn: Mutex::new(None) });
        Ok(())
    }

    async fn exit(&self, env: &Environment, _outcome: Outcome) -> Result<(), Error> {
        if let Some(conn) = env.local().get::<RequestConnection>().and_then(|r| r.take()) {
            env.log().info("disconnecting database");
            conn.close();
        }
        Ok(())
    }
}

/// The database root of the current request.
#[derive(Debug, Clone)]
pub struct Persistent(pub Root);

impl Deref for Persistent {
    type Target = Root;

    fn deref(&self) -> &Root {
        &self.0
    }
}

impl FromEnvironment for Persistent {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(Self(Persistence::root(env)?))
    }
}

/// Typed access to the document `T` of the current request.
pub struct Db<T> {
    root: Root,
    _document: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Db<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("document", &std::any::type_name::<T>()).finish_non_exhaustive()
    }
}

impl<T: Document> Db<T> {
    /// The stored document, or its default.
    ///
    /// # Errors
    /// Fails when the stored value has another shape.
    pub fn get(&self) -> Result<T, PersistenceError> {
        self.root.document::<T>().context(format!("Loading `{}`", T::KEY))
    }

    /// # Errors
    /// Fails when the document cannot be encoded.
    pub fn save(&self, document: &T) -> Result<(), PersistenceError> {
        self.root.save(document).context(format!("Saving `{}`", T::KEY))
    }

    #[must_use]
    pub const fn root(&self) -> &Root {
        &self.root
    }
}

impl<T: Document> FromEnvironment for Db<T> {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(Self { root: Persistence::root(env)?, _document: PhantomData })
    }
}
