use std::borrow::Cow;

#[ramverk_derive::ramverk_error]
pub enum PersistenceError {
    #[error("Database error{}: {source}", format_context(.context))]
    Database { source: ramverk_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal persistence error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<PersistenceError> for ramverk_kernel::Error {
    fn from(err: PersistenceError) -> Self {
        Self::internal(err)
    }
}
