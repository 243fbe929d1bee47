use std::borrow::Cow;

/// A specialized [`StorageError`] enum of this crate.
#[ramverk_derive::ramverk_error]
pub enum StorageError {
    #[error("Serial conflict{}: expected {expected}, found {actual}", format_context(.context))]
    Conflict { expected: u64, actual: u64, context: Option<Cow<'static, str>> },

    #[error("Corrupted record{}: {message}", format_context(.context))]
    Corrupted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Path traversal security violation{}: {message}", format_context(.context))]
    PathTraversalAttempt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Decompression failure{}: {source}", format_context(.context))]
    Decompress { source: lz4_flex::block::DecompressError, context: Option<Cow<'static, str>> },
}

impl StorageError {
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
