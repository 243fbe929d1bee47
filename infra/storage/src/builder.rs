use crate::error::{StorageError, StorageErrorExt};
use crate::file::{Compression, FileStorage, FileStorageInner, initial_serial};
use crate::security;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

const DEFAULT_FILE: &str = "ramverk.db";

#[derive(Debug, Clone)]
struct FileStorageConfig {
    file: PathBuf,
    compression: Compression,
    create: bool,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self { file: PathBuf::from(DEFAULT_FILE), compression: Compression::None, create: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct FileStorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: FileStorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> FileStorageBuilder<S> {
    #[must_use = "Sets compression for newly written records"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    #[must_use = "Sets whether the root directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    /// Record file name, relative to the root.
    #[must_use = "Sets the record file inside the root"]
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.file = file.into();
        self
    }

    fn transition<N: Sealed>(self, state: N) -> FileStorageBuilder<N> {
        FileStorageBuilder { state, config: self.config }
    }
}

impl FileStorageBuilder<NoRoot> {
    #[must_use = "Creates a new file storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the sandbox directory the record file lives in"]
    pub fn root(self, path: impl Into<PathBuf>) -> FileStorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl FileStorageBuilder<WithRoot> {
    /// Opens the storage.
    ///
    /// 1. Creates the root directory if `create(true)` was set.
    /// 2. Canonicalizes the root and resolves the record file inside the sandbox.
    /// 3. Removes orphaned temporary files left behind by crashed writers.
    /// 4. Reads the serial of the current record, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be created or resolved,
    /// [`StorageError::PathTraversalAttempt`] if the file escapes the root, and
    /// [`StorageError::Corrupted`] if an existing record cannot be decoded.
    pub async fn open(self) -> Result<FileStorage, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;
        let path = security::resolve_path(&canonical, &self.config.file)?;
        let name = path.file_name().map_or_else(
            || DEFAULT_FILE.to_owned(),
            |n| n.to_string_lossy().into_owned(),
        );

        let storage = FileStorage {
            inner: Arc::new(FileStorageInner {
                name,
                root: canonical,
                serial: Mutex::new(initial_serial(&path).await?),
                path,
                compression: self.config.compression,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        storage.purge_tmp().await;
        info!(path = %storage.path().display(), "Opened file storage");

        Ok(storage)
    }
}
