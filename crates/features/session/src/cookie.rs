use crate::error::{SessionError, SessionErrorExt};
use crate::key::SecretKey;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Session values keyed by name.
pub type SessionData = serde_json::Map<String, Value>;

/// Session payload stored client side as `base64url(json).base64url(hmac-sha256)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecureJsonCookie {
    data: SessionData,
    modified: bool,
}

impl SecureJsonCookie {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a cookie value. Missing, tampered and malformed cookies give an empty session.
    #[must_use]
    pub fn load(raw: Option<&str>, key: &SecretKey) -> Self {
        raw.and_then(|raw| Self::unsign(raw, key)).unwrap_or_default()
    }

    fn unsign(raw: &str, key: &SecretKey) -> Option<Self> {
        let (payload, tag) = raw.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let data = serde_json::from_slice(&json).ok()?;
        Some(Self { data, modified: false })
    }

    /// The signed cookie value.
    ///
    /// # Errors
    /// Fails when a value cannot be encoded.
    pub fn serialize(&self, key: &SecretKey) -> Result<String, SessionError> {
        let json = serde_json::to_vec(&self.data).context("Encoding session")?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| SessionError::Internal {
            message: e.to_string().into(),
            context: Some("Signing session".into()),
        })?;
        mac.update(payload.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{tag}"))
    }

    /// # Errors
    /// Fails when the stored value has another shape than `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let Some(value) = self.data.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone()).context(format!("Decoding session value `{key}`")).map(Some)
    }

    /// # Errors
    /// Fails when `value` cannot be encoded as JSON.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).context("Encoding session value")?;
        self.data.insert(key.into(), value);
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.data.remove(key).is_some();
        self.modified |= removed;
        removed
    }

    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.data.clear();
            self.modified = true;
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether the session changed since it was loaded and must be sent again.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub const fn data(&self) -> &SessionData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bytes: &[u8]) -> SecretKey {
        SecretKey::from_bytes(bytes.to_vec()).unwrap()
    }

    fn signed(key: &SecretKey) -> String {
        let mut cookie = SecureJsonCookie::new();
        cookie.insert("user", "ada").unwrap();
        cookie.insert("visits", &3).unwrap();
        cookie.serialize(key).unwrap()
    }

    #[test]
    fn signed_cookies_load_unmodified() {
        let key = key(b"secret");
        let loaded = SecureJsonCookie::load(Some(&signed(&key)), &key);

        assert_eq!(loaded.get::<String>("user").unwrap().as_deref(), Some("ada"));
        assert_eq!(loaded.get::<u32>("visits").unwrap(), Some(3));
        assert!(!loaded.is_modified());
    }

    #[test]
    fn tampered_payloads_are_dropped() {
        let key = key(b"secret");
        let value = signed(&key);
        let (_, tag) = value.split_once('.').unwrap();
        let forged = format!("{}.{tag}", URL_SAFE_NO_PAD.encode(br#"{"user":"root"}"#));

        assert!(SecureJsonCookie::load(Some(&forged), &key).is_empty());
        assert!(SecureJsonCookie::load(Some(&value), &self::key(b"other")).is_empty());
    }

    #[test]
    fn malformed_values_give_empty_sessions() {
        let key = key(b"secret");
        for raw in ["", "no-dot", "a.b", "!!.??"] {
            let cookie = SecureJsonCookie::load(Some(raw), &key);
            assert!(cookie.is_empty(), "{raw}");
            assert!(!cookie.is_modified());
        }
        assert_eq!(SecureJsonCookie::load(None, &key), SecureJsonCookie::new());
    }

    #[test]
    fn only_real_changes_mark_modified() {
        let mut cookie = SecureJsonCookie::new();
        assert!(!cookie.remove("missing"));
        cookie.clear();
        assert!(!cookie.is_modified());

        cookie.insert("k", &true).unwrap();
        assert!(cookie.contains("k"));
        assert!(cookie.is_modified());
        assert!(cookie.get::<u32>("k").is_err());
    }
}
