use std::borrow::Cow;

/// Errors while assembling the fullstack preset.
#[ramverk_derive::ramverk_error]
pub enum FullstackError {
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: ramverk_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Persistence error{}: {source}", format_context(.context))]
    Persistence { source: ramverk_persistence::PersistenceError, context: Option<Cow<'static, str>> },

    #[error("Logger error{}: {source}", format_context(.context))]
    Logger { source: ramverk_logger::LoggerError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
