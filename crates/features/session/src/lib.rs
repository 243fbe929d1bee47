//! # Sessions
//!
//! Client-side sessions for Ramverk applications. The session lives in a cookie holding a
//! JSON object signed with HMAC-SHA256 under the application's [`SecretKey`].
//!
//! Install the [`Sessions`] component and take [`Session`] as a handler argument:
//!
//! ```rust,no_run
//! use ramverk_kernel::domain::config::Settings;
//! use ramverk_kernel::{Application, Error, routing};
//! use ramverk_session::{Session, Sessions};
//!
//! async fn visit(session: Session) -> Result<String, Error> {
//!     let visits = session.get::<u32>("visits")?.unwrap_or(0) + 1;
//!     session.insert("visits", &visits)?;
//!     Ok(format!("visit number {visits}"))
//! }
//!
//! let app: Result<Application, Error> = Application::builder(Settings::named("Counter"))
//!     .component(Sessions::new())
//!     .route(routing::get("/").endpoint("visit"), visit)
//!     .build();
//! ```

mod cookie;
mod error;
mod key;

pub use cookie::{SecureJsonCookie, SessionData};
pub use error::{SessionError, SessionErrorExt};
pub use key::SecretKey;

use async_trait::async_trait;
use parking_lot::Mutex;
use ramverk_kernel::axum::http::{HeaderValue, header};
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::{Component, Environment, Error, FromEnvironment, Next, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::OnceCell;

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; SameSite=Lax";

#[derive(Debug, Default)]
struct SessionState {
    cookie: Mutex<SecureJsonCookie>,
}

/// The session of the current request.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<SessionState>,
}

impl Session {
    /// The session loaded for `env`, `None` when [`Sessions`] is not installed.
    #[must_use]
    pub fn of(env: &Environment) -> Option<Self> {
        env.local().get::<SessionState>().map(|state| Self { state })
    }

    /// # Errors
    /// Fails when the stored value has another shape than `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.state.cookie.lock().get(key)
    }

    /// # Errors
    /// Fails when `value` cannot be encoded as JSON.
    pub fn insert<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<(), SessionError> {
        self.state.cookie.lock().insert(key, value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.state.cookie.lock().remove(key)
    }

    pub fn clear(&self) {
        self.state.cookie.lock().clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.cookie.lock().contains(key)
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.state.cookie.lock().is_modified()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.cookie.lock().is_empty()
    }

    /// A copy of the current payload.
    #[must_use]
    pub fn snapshot(&self) -> SecureJsonCookie {
        self.state.cookie.lock().clone()
    }
}

impl FromEnvironment for Session {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Self::of(env).ok_or_else(|| Error::from("Sessions component is not installed"))
    }
}

/// Loads the session cookie on enter and sends it back when it changed.
#[derive(Debug, Default)]
pub struct Sessions {
    key: OnceCell<Arc<SecretKey>>,
}

impl Sessions {
    /// Sessions signed with the key file configured in `security`, read on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key(key: SecretKey) -> Self {
        Self { key: OnceCell::new_with(Some(Arc::new(key))) }
    }

    /// The signing key. A relative key file is resolved against the data directory.
    ///
    /// # Errors
    /// See [`SecretKey::load_or_generate`].
    pub async fn key(&self, settings: &Settings) -> Result<Arc<SecretKey>, SessionError> {
        self.key
            .get_or_try_init(|| async move {
                let path = settings.storage.data_dir.join(&settings.security.secret_key_file);
                SecretKey::load_or_generate(&path, settings.security.secret_key_bytes).await.map(Arc::new)
            })
            .await
            .cloned()
    }
}

fn set_cookie(name: &str, cookie: &SecureJsonCookie, key: &SecretKey) -> Result<HeaderValue, SessionError> {
    let value = if cookie.is_empty() {
        format!("{name}=; Max-Age=0; {COOKIE_ATTRIBUTES}")
    } else {
        format!("{name}={}; {COOKIE_ATTRIBUTES}", cookie.serialize(key)?)
    };
    HeaderValue::from_str(&value).map_err(|e| SessionError::Internal {
        message: e.to_string().into(),
        context: Some(format!("Session cookie `{name}`").into()),
    })
}

#[async_trait]
impl Component for Sessions {
    fn name(&self) -> &'static str {
        "sessions"
    }

    async fn enter(&self, env: &Environment) -> Result<(), Error> {
        let key = self.key(env.settings()).await?;
        let raw = env.request().cookie(&env.settings().security.session_cookie);
        let cookie = SecureJsonCookie::load(raw, &key);
        env.local().insert(SessionState { cookie: Mutex::new(cookie) });
        Ok(())
    }

    async fn respond(&self, env: &Environment, next: Next<'_>) -> Result<Response, Error> {
        let mut response = next.run(env).await?;
        let Some(session) = Session::of(env) else {
            return Ok(response);
        };
        if session.is_modified() {
            let key = self.key(env.settings()).await?;
            let name = &env.settings().security.session_cookie;
            response.append_header(header::SET_COOKIE, set_cookie(name, &session.snapshot(), &key)?);
            env.log().debug("saving session");
        }
        Ok(response)
    }
}
