use crate::error::{SessionError, SessionErrorExt};
use getrandom::fill;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key material used to sign session cookies.
///
/// The bytes are cleared from memory when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").field("len", &self.bytes.len()).finish_non_exhaustive()
    }
}

impl SecretKey {
    /// # Errors
    /// Returns [`SessionError::Internal`] for an empty key.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SessionError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err("Secret key is empty".into());
        }
        Ok(Self { bytes })
    }

    /// Fresh random key of `len` bytes from the system RNG.
    ///
    /// # Errors
    /// Returns [`SessionError::Internal`] when `len` is zero or the RNG is unavailable.
    pub fn generate(len: usize) -> Result<Self, SessionError> {
        if len == 0 {
            return Err("Secret keys need at least one byte".into());
        }
        let mut bytes = vec![0u8; len];
        fill(&mut bytes).map_err(|e| SessionError::Internal {
            message: e.to_string().into(),
            context: Some("Generating secret key".into()),
        })?;
        Ok(Self { bytes })
    }

    /// Reads the key stored at `path`, generating and writing `len` random bytes when the
    /// file does not exist. New key files are only readable by their owner.
    ///
    /// # Errors
    /// Any I/O error other than a missing file, and an empty key file.
    pub async fn load_or_generate(path: impl AsRef<Path>, len: usize) -> Result<Self, SessionError> {
        let path = path.as_ref();
        match fs::read(path).await {
            Ok(bytes) => Self::from_bytes(bytes).context(format!("Reading `{}`", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let key = Self::generate(len)?;
                key.write_new(path).await?;
                tracing::info!(path = %path.display(), bytes = len, "Generated secret key");
                Ok(key)
            },
            Err(err) => Err(err).context(format!("Reading `{}`", path.display())),
        }
    }

    async fn write_new(&self, path: &Path) -> Result<(), SessionError> {
        let context = || format!("Writing `{}`", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.context(context())?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.context(context())?;
        file.write_all(&self.bytes).await.context(context())?;
        file.sync_all().await.context(context())?;
        Ok(())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_the_requested_length() {
        let key = SecretKey::generate(64).unwrap();
        assert_eq!(key.len(), 64);
        assert!(SecretKey::generate(0).is_err());
        assert!(SecretKey::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn debug_hides_the_bytes() {
        let key = SecretKey::from_bytes(*b"hunter2").unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("len: 7"));
        assert!(!printed.contains("104"));
    }

    #[tokio::test]
    async fn missing_files_are_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("secret.key");

        let first = SecretKey::load_or_generate(&path, 32).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first.as_bytes());

        let second = SecretKey::load_or_generate(&path, 8).await.unwrap();
        assert_eq!(second.as_bytes(), first.as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generated_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        SecretKey::load_or_generate(&path, 16).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn other_io_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let err = SecretKey::load_or_generate(dir.path(), 16).await.unwrap_err();
        assert!(matches!(err, SessionError::Key { .. }));
    }
}
