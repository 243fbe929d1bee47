use crate::error::{PersistenceError, PersistenceErrorExt};
use async_trait::async_trait;
use ramverk_database::TransactionManager;
use ramverk_kernel::{Component, Environment, Error, FromEnvironment, Outcome};
use std::ops::Deref;
use std::sync::Arc;

/// Wraps every request in a transaction.
///
/// The transaction is committed when the request completes, HTTP error pages included, and
/// aborted when it failed or was doomed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transactions;

impl Transactions {
    /// The transaction of the current request, if one was begun.
    #[must_use]
    pub fn current(env: &Environment) -> Option<Arc<TransactionManager>> {
        env.local().get::<TransactionManager>()
    }
}

#[async_trait]
impl Component for Transactions {
    fn name(&self) -> &'static str {
        "transactions"
    }

    async fn enter(&self, env: &Environment) -> Result<(), Error> {
        let manager = env.local().get_or_init(TransactionManager::new);
        manager.begin().await.context("Beginning transaction")?;
        Ok(())
    }

    async fn exit(&self, env: &Environment, outcome: Outcome) -> Result<(), Error> {
        let Some(manager) = Self::current(env).filter(|m| m.is_active()) else {
            return Ok(());
        };
        if outcome.is_completed() && !manager.is_doomed() {
            env.log().info("committing transaction");
            manager.commit().await.context("Committing transaction")?;
        } else {
            env.log().info("aborting transaction");
            manager.abort().await.context("Aborting transaction")?;
        }
        Ok(())
    }
}

/// The transaction of the current request.
#[derive(Debug, Clone)]
pub struct Transaction(Arc<TransactionManager>);

impl Deref for Transaction {
    type Target = TransactionManager;

    fn deref(&self) -> &TransactionManager {
        &self.0
    }
}

impl FromEnvironment for Transaction {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Transactions::current(env)
            .map(Self)
            .ok_or_else(|| PersistenceError::from("Transactions component is not installed").into())
    }
}
