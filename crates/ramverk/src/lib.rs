//! Facade crate for Ramverk.
//! Re-exports the kernel, the feature components and the infrastructure crates, and
//! assembles them into the [`fullstack`] preset.
//! Keep this crate thin: it should compose other crates, not implement framework logic.
//!
//! ## Usage
//! - Build an application with [`fullstack::builder`], then add routes or scan modules.
//! - Install the console logger with [`fullstack::logger`].

mod error;
pub mod fullstack;

pub use error::{FullstackError, FullstackErrorExt};

pub use ramverk_database as database;
pub use ramverk_domain as domain;
pub use ramverk_kernel as kernel;
pub use ramverk_logger as logger;
pub use ramverk_storage as storage;

pub use ramverk_kernel::{
    Application, ApplicationBuilder, Args, Component, Context, Environment, Error, Ext, Form,
    FromEnvironment, Json, JsonRendering, Module, Next, Outcome, Request, Resource, Response, Rule,
    RuleSet, ScanOptions, Scanner, Segments, Values, async_trait, routing,
};

/// The feature components.
pub mod features {
    pub use ramverk_assets as assets;
    pub use ramverk_persistence as persistence;
    pub use ramverk_session as session;
    pub use ramverk_templating as templating;

    /// Names of the components installed by [`crate::fullstack::builder`], in order.
    pub const FULLSTACK: &[&str] = &["sessions", "persistence", "transactions", "templates", "json", "shared-data"];
}

pub use features::{assets, persistence, session, templating};
