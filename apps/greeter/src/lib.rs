//! # Greeter
//!
//! A sample Ramverk application: it greets visitors with a stored greeting that anyone can
//! change through a form.
//!
//! ## Example
//! ```no_run
//! use ramverk_greeter::{build, default_settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     build(default_settings()).await?.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod frontend;

use anyhow::{Context, Result};
use ramverk::Application;
use ramverk::database::Document;
use ramverk::domain::config::Settings;
use ramverk::fullstack;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The greeting shown to visitors, stored under `greeter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub greeting: String,
}

impl Default for Greeting {
    fn default() -> Self {
        Self { greeting: "Hello".to_owned() }
    }
}

impl Document for Greeting {
    const KEY: &'static str = "greeter";
}

/// Settings for running the greeter from its source directory.
#[must_use]
pub fn default_settings() -> Settings {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut settings = Settings::named("Greeter");
    settings.module = "greeter".to_owned();
    settings.storage.templates_dir = root.join("templates");
    settings.storage.static_dir = root.join("static");
    settings
}

/// Builds the greeter on the fullstack preset.
///
/// # Errors
/// Fails when the database cannot be opened or the routes are invalid.
pub async fn build(settings: Settings) -> Result<Application> {
    let app = fullstack::builder(settings)
        .await
        .context("Assembling the fullstack components")?
        .scan(&frontend::Frontend)
        .build()
        .context("Building the greeter")?;
    Ok(app)
}
