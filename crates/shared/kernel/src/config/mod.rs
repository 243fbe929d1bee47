use crate::domain::constants::ENV_PREFIX;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

#[ramverk_derive::ramverk_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads settings from an optional file layered under `RAMVERK__` environment variables.
///
/// Nested keys use a double underscore: `RAMVERK__SERVER__PORT=9000` sets `server.port`.
/// Without a file only the environment (and the type's serde defaults) apply.
///
/// # Errors
/// Fails when a given file is missing or the merged values do not match `T`.
///
/// # Example
/// ```rust
/// use ramverk_kernel::config::load_config;
/// use ramverk_kernel::domain::config::Settings;
///
/// let settings: Settings = load_config(None::<&str>).unwrap();
/// assert_eq!(settings.server.port, 8008);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();
    if let Some(path) = path.as_ref().map(AsRef::as_ref) {
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
