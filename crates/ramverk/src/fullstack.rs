//! The batteries-included application preset.
//!
//! Components are installed in this order: sessions (optional), persistence, transactions,
//! templates, JSON rendering and shared data. Exits run in reverse, so the transaction is
//! settled before the database connection is closed.

use crate::error::{FullstackError, FullstackErrorExt};
use ramverk_assets::SharedData;
use ramverk_domain::config::Settings;
use ramverk_kernel::{Application, ApplicationBuilder, JsonRendering};
use ramverk_logger::Logger;
use ramverk_persistence::{Persistence, Transactions};
use ramverk_session::Sessions;
use ramverk_storage::{Compression, FileStorage, MemoryStorage, Storage};
use ramverk_templating::Templates;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Install [`Sessions`].
    pub sessions: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { sessions: true }
    }
}

/// An application builder with every component installed.
///
/// # Errors
/// Fails when the database storage cannot be opened.
pub async fn builder(settings: Settings) -> Result<ApplicationBuilder, FullstackError> {
    builder_with(settings, Options::default()).await
}

/// # Errors
/// See [`builder`].
pub async fn builder_with(settings: Settings, options: Options) -> Result<ApplicationBuilder, FullstackError> {
    let persistence = Persistence::open(storage(&settings).await?).await?;

    let mut builder = Application::builder(settings);
    if options.sessions {
        builder = builder.component(Sessions::new());
    }
    Ok(builder
        .component(persistence)
        .component(Transactions)
        .component(Templates::new())
        .component(JsonRendering)
        .component(SharedData::new()))
}

/// The database storage: in memory when `storage.memory` is set, otherwise the database
/// file under the data directory, created on demand.
///
/// # Errors
/// Fails when the file storage cannot be opened.
pub async fn storage(settings: &Settings) -> Result<Arc<dyn Storage>, FullstackError> {
    if settings.storage.memory {
        return Ok(Arc::new(MemoryStorage::new()));
    }

    let path = settings.database_path();
    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .ok_or_else(|| FullstackError::from(format!("Invalid database path `{}`", path.display())))?;
    let compression = if settings.storage.compression { Compression::Lz4 } else { Compression::None };

    let storage = FileStorage::builder()
        .root(root)
        .file(file)
        .compression(compression)
        .create(true)
        .open()
        .await
        .context(format!("Opening `{}`", path.display()))?;
    Ok(Arc::new(storage))
}

/// Installs the console logger in the debug or production profile of `settings`.
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn logger(settings: &Settings) -> Result<Logger, FullstackError> {
    Ok(Logger::builder().name(settings.name.clone()).debug(settings.debug).init()?)
}
