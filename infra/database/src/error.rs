use ramverk_storage::StorageError;
use std::borrow::Cow;

/// A specialized [`DatabaseError`] enum of this crate.
#[ramverk_derive::ramverk_error]
pub enum DatabaseError {
    /// A wrapper for storage failures, including serial conflicts.
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage {
        #[source]
        source: StorageError,
        context: Option<Cow<'static, str>>,
    },

    /// Values that cannot be converted to or from JSON.
    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    /// The connection was used after `close`.
    #[error("Connection closed{}", format_context(.context))]
    Closed { context: Option<Cow<'static, str>> },

    /// `join`, `doom` or `commit` without an active transaction.
    #[error("No active transaction{}", format_context(.context))]
    NoTransaction { context: Option<Cow<'static, str>> },

    /// The transaction was doomed and may only be aborted.
    #[error("Transaction is doomed{}", format_context(.context))]
    Doomed { context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DatabaseError {
    /// Whether another writer committed first.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage { source, .. } if source.is_conflict())
    }
}
