use std::borrow::Cow;

/// Errors of the session feature.
#[ramverk_derive::ramverk_error]
pub enum SessionError {
    /// The secret key file could not be read or written.
    #[error("Secret key error{}: {source}", format_context(.context))]
    Key { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Session serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal session error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<SessionError> for ramverk_kernel::Error {
    fn from(err: SessionError) -> Self {
        Self::internal(err)
    }
}
