use crate::error::DatabaseError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resource that takes part in a transaction.
#[async_trait]
pub trait DataManager: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Makes the pending changes durable.
    ///
    /// # Errors
    /// A failed commit aborts the whole transaction.
    async fn commit(&self) -> Result<(), DatabaseError>;

    /// Discards the pending changes.
    ///
    /// # Errors
    /// Reported after every other manager was aborted.
    async fn abort(&self) -> Result<(), DatabaseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Active,
    Committed,
    Aborted,
}

#[derive(Debug, Default)]
struct State {
    status: Status,
    doomed: bool,
    resources: Vec<Arc<dyn DataManager>>,
}

/// Coordinates the data managers touched while handling one request.
#[derive(Debug, Default)]
pub struct TransactionManager {
    state: Mutex<State>,
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new transaction, aborting the current one if it is still active.
    ///
    /// # Errors
    /// Propagates abort failures of the replaced transaction.
    pub async fn begin(&self) -> Result<(), DatabaseError> {
        if self.is_active() {
            warn!("Beginning a transaction while another is active, aborting it");
            self.abort().await?;
        }
        let mut state = self.state.lock();
        *state = State { status: Status::Active, ..State::default() };
        Ok(())
    }

    /// Adds a data manager to the active transaction. Joining twice is a no-op.
    ///
    /// # Errors
    /// Returns [`DatabaseError::NoTransaction`] when no transaction is active.
    pub fn join(&self, manager: Arc<dyn DataManager>) -> Result<(), DatabaseError> {
        let mut state = self.state.lock();
        if state.status != Status::Active {
            return Err(DatabaseError::NoTransaction { context: Some("Join".into()) });
        }
        let joined = state
            .resources
            .iter()
            .any(|r| std::ptr::addr_eq(Arc::as_ptr(r), Arc::as_ptr(&manager)));
        if !joined {
            debug!(manager = manager.name(), "Data manager joined transaction");
            state.resources.push(manager);
        }
        Ok(())
    }

    /// Marks the transaction so that it can only be aborted.
    ///
    /// # Errors
    /// Returns [`DatabaseError::NoTransaction`] when no transaction is active.
    pub fn doom(&self) -> Result<(), DatabaseError> {
        let mut state = self.state.lock();
        if state.status != Status::Active {
            return Err(DatabaseError::NoTransaction { context: Some("Doom".into()) });
        }
        state.doomed = true;
        Ok(())
    }

    #[must_use]
    pub fn is_doomed(&self) -> bool {
        self.state.lock().doomed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().status == Status::Active
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Commits every joined manager in join order.
    ///
    /// On the first failure the remaining managers, the failed one included, are aborted
    /// and the transaction ends as [`Status::Aborted`]. Managers committed before the
    /// failure stay committed.
    ///
    /// # Errors
    /// [`DatabaseError::NoTransaction`] when idle, [`DatabaseError::Doomed`] when doomed
    /// (the transaction stays active so it can be aborted), or the failing manager's error.
    pub async fn commit(&self) -> Result<(), DatabaseError> {
        let resources = {
            let mut state = self.state.lock();
            if state.status != Status::Active {
                return Err(DatabaseError::NoTransaction { context: Some("Commit".into()) });
            }
            if state.doomed {
                return Err(DatabaseError::Doomed { context: None });
            }
            std::mem::take(&mut state.resources)
        };

        for (index, manager) in resources.iter().enumerate() {
            if let Err(err) = manager.commit().await {
                warn!(manager = manager.name(), error = %err, "Commit failed, aborting transaction");
                let _ = Self::abort_all(&resources[index..]).await;
                self.finish(Status::Aborted);
                return Err(err);
            }
        }

        self.finish(Status::Committed);
        Ok(())
    }

    /// Aborts every joined manager. Aborting an inactive transaction does nothing.
    ///
    /// # Errors
    /// Returns the first abort failure after all managers were asked to abort.
    pub async fn abort(&self) -> Result<(), DatabaseError> {
        let resources = {
            let mut state = self.state.lock();
            if state.status != Status::Active {
                return Ok(());
            }
            std::mem::take(&mut state.resources)
        };

        let result = Self::abort_all(&resources).await;
        self.finish(Status::Aborted);
        result
    }

    async fn abort_all(resources: &[Arc<dyn DataManager>]) -> Result<(), DatabaseError> {
        let mut first = None;
        for manager in resources {
            if let Err(err) = manager.abort().await {
                warn!(manager = manager.name(), error = %err, "Abort failed");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn finish(&self, status: Status) {
        let mut state = self.state.lock();
        state.status = status;
        state.doomed = false;
        state.resources.clear();
    }
}
