//! Single-file storage with atomic swaps and optional compression.
//!
//! On-disk layout: `RVK1` magic, one flags byte (bit 0: LZ4), the serial as little-endian
//! `u64`, then the payload.

use crate::builder::FileStorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::{EMPTY_SERIAL, Record, Storage, check_serial, maintenance};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const MAGIC: &[u8; 4] = b"RVK1";
const FLAG_LZ4: u8 = 0b0000_0001;
const HEADER_LEN: usize = MAGIC.len() + 1 + size_of::<u64>();
pub(crate) const TMP_MARKER: &str = ".rvktmp.";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    const fn flag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lz4 => FLAG_LZ4,
        }
    }

    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }
}

/// The internal shared state of a [`FileStorage`].
#[derive(Debug)]
pub struct FileStorageInner {
    pub(crate) name: String,
    /// Canonical sandbox root.
    pub(crate) root: PathBuf,
    /// Resolved record file inside `root`.
    pub(crate) path: PathBuf,
    pub(crate) compression: Compression,
    pub(crate) tmp_counter: AtomicU64,
    /// Serial of the record on disk. Held while storing so swaps are serialized.
    pub(crate) serial: Mutex<u64>,
}

/// A database file inside a sandboxed directory.
///
/// The handle is reference-counted and can be cloned across tasks. Stores are serialized
/// in-process; the on-disk file is only ever replaced by a rename, so readers never observe
/// a partially written record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    pub(crate) inner: Arc<FileStorageInner>,
}

impl Deref for FileStorage {
    type Target = FileStorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FileStorage {
    #[must_use = "The storage is not opened until you call .open()"]
    pub fn builder() -> FileStorageBuilder {
        FileStorageBuilder::new()
    }

    /// Canonical sandbox directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path of the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn read_record(path: &Path) -> Result<Option<Record>, StorageError> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", path.display()).into()),
                });
            },
        };
        decode(&raw).map(Some)
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory for {}", self.path.display()))?;
        }
        let temp = unique_tmp_path(&self.path, &self.tmp_counter);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(bytes).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &self.path).await {
            if err.kind() != ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), self.path.display())
                            .into(),
                    ),
                });
            }
            fs::remove_file(&self.path)
                .await
                .context(format!("Failed to replace existing file: {}", self.path.display()))?;
            fs::rename(&temp, &self.path).await.context(format!(
                "Atomic swap failed: {} -> {}",
                temp.display(),
                self.path.display()
            ))?;
        }

        if let Some(parent) = self.path.parent() {
            sync_dir(parent).await;
        }
        Ok(())
    }

    /// Removes stale temporary siblings of the record file.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.path).await;
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Option<Record>, StorageError> {
        Self::read_record(&self.path).await
    }

    async fn store(&self, expected: u64, data: Vec<u8>) -> Result<u64, StorageError> {
        let mut current = self.serial.lock().await;
        let serial = check_serial(expected, *current)?;

        self.write_atomic(&encode(self.compression, serial, &data)).await?;
        *current = serial;

        debug!(path = %self.path.display(), serial, "Record saved atomically");
        Ok(serial)
    }
}

fn encode(compression: Compression, serial: u64, data: &[u8]) -> Vec<u8> {
    let payload = compression.compress(data);
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(compression.flag());
    out.extend_from_slice(&serial.to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn decode(raw: &[u8]) -> Result<Record, StorageError> {
    let corrupted = |message: &'static str| StorageError::Corrupted {
        message: message.into(),
        context: None,
    };

    if raw.len() < HEADER_LEN {
        return Err(corrupted("record shorter than header"));
    }
    let (magic, rest) = raw.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(corrupted("bad magic"));
    }
    let (flags, rest) = rest.split_at(1);
    let (serial, payload) = rest.split_at(size_of::<u64>());
    let serial = u64::from_le_bytes(serial.try_into().map_err(|_| corrupted("bad serial"))?);

    let data = if flags[0] & FLAG_LZ4 == 0 {
        payload.to_vec()
    } else {
        lz4_flex::decompress_size_prepended(payload).context("Lz4 decompression failed")?
    };

    Ok(Record { serial, data })
}

pub(crate) async fn initial_serial(path: &Path) -> Result<u64, StorageError> {
    Ok(FileStorage::read_record(path).await?.map_or(EMPTY_SERIAL, |r| r.serial))
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("record");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}
