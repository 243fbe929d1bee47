use std::fmt::Display;
use std::sync::Arc;

/// Log channel named after the application.
///
/// Events carry the name in their `channel` field, which the console format prints in
/// front of the message.
#[derive(Debug, Clone)]
pub struct Channel {
    name: Arc<str>,
}

impl Channel {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace(&self, message: impl Display) {
        tracing::trace!(channel = %self.name, "{message}");
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(channel = %self.name, "{message}");
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(channel = %self.name, "{message}");
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(channel = %self.name, "{message}");
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(channel = %self.name, "{message}");
    }
}
