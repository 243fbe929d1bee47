use crate::constants::{DEFAULT_MODULE, DEFAULT_NAME};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsInner {
    /// Application name, also the log channel name.
    pub name: String,
    /// Root module path that `.relative` endpoints expand against.
    pub module: String,
    pub debug: bool,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

/// Thin Arc-wrapped settings for inexpensive cloning into components.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten, default)]
    inner: Arc<SettingsInner>,
}

impl Settings {
    #[must_use]
    pub fn new(inner: SettingsInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// Settings for the named application, everything else defaulted.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(SettingsInner { name: name.into(), ..SettingsInner::default() })
    }

    /// Database file, `<data_dir>/<lowercased name>.db` unless configured.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        let file = self
            .storage
            .database
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.db", self.name.to_lowercase())));
        self.storage.data_dir.join(file)
    }
}

impl Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut SettingsInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    /// Host name used for subdomain matching and external URLs.
    pub server_name: Option<String>,
}

impl ServerConfig {
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Secret key and session cookie knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub secret_key_file: PathBuf,
    pub secret_key_bytes: usize,
    pub session_cookie: String,
}

/// Storage roots and persistence options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// URL prefix the static directory is served under.
    pub static_path: String,
    pub templates_dir: PathBuf,
    pub database: Option<PathBuf>,
    pub compression: bool,
    /// Keep the database in memory only.
    pub memory: bool,
}

// --- Default ---

impl Default for SettingsInner {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            module: DEFAULT_MODULE.to_owned(),
            debug: false,
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 8008, server_name: None }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key_file: PathBuf::from("secret.key"),
            secret_key_bytes: 256,
            session_cookie: "session".to_owned(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            static_dir: PathBuf::from("static"),
            static_path: "/static".to_owned(),
            templates_dir: PathBuf::from("templates"),
            database: None,
            compression: false,
            memory: false,
        }
    }
}
