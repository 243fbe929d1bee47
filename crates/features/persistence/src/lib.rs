//! # Persistence
//!
//! Two components bring the database into the request bracket:
//!
//! * [`Persistence`] opens a [`Connection`](ramverk_database::Connection) the first time a
//!   request asks for one and closes it when the request ends.
//! * [`Transactions`] begins a transaction on enter and commits or aborts it on exit. Every
//!   connection opened during the request joins it.
//!
//! Handlers take [`Persistent`] for the raw root, [`Db`] for a typed document, and
//! [`Transaction`] to doom the request's changes.
//!
//! ```rust
//! use ramverk_database::Document;
//! use ramverk_kernel::domain::config::Settings;
//! use ramverk_kernel::{Application, Error, routing};
//! use ramverk_persistence::{Db, Persistence, Transactions};
//! use ramverk_storage::MemoryStorage;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Hits(u64);
//!
//! impl Document for Hits {
//!     const KEY: &'static str = "hits";
//! }
//!
//! async fn hit(hits: Db<Hits>) -> Result<String, Error> {
//!     let Hits(count) = hits.get()?;
//!     hits.save(&Hits(count + 1))?;
//!     Ok(format!("{}", count + 1))
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let persistence = Persistence::open(Arc::new(MemoryStorage::new())).await?;
//! let app = Application::builder(Settings::named("Hits"))
//!     .component(persistence)
//!     .component(Transactions)
//!     .route(routing::post("/hit").endpoint("hit"), hit)
//!     .build()?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

mod connection;
mod error;
mod transaction;

pub use connection::{Db, Persistence, Persistent};
pub use error::{PersistenceError, PersistenceErrorExt};
pub use transaction::{Transaction, Transactions};
