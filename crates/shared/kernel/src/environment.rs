use crate::application::{Application, subdomain_of};
use crate::domain::config::Settings;
use crate::error::Error;
use crate::local::Local;
use crate::log::Channel;
use crate::request::Request;
use crate::response::Response;
use crate::routing::{Routing, Rule, Segments, Values};
use axum::http::header;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

static NO_SEGMENTS: Segments = Segments::empty();

struct EnvironmentInner {
    application: Application,
    request: Request,
    routing: Routing,
    local: Local,
}

/// Everything known about the request being handled. Cheap to clone.
///
/// A fresh environment, with a fresh [`Local`], is created for every request.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("application", &self.inner.application.name())
            .field("method", self.inner.request.method())
            .field("path", &self.inner.request.path())
            .field("endpoint", &self.endpoint())
            .finish_non_exhaustive()
    }
}

impl Environment {
    pub(crate) fn new(application: Application, request: Request, routing: Routing) -> Self {
        Self {
            inner: Arc::new(EnvironmentInner { application, request, routing, local: Local::new() }),
        }
    }

    #[must_use]
    pub fn application(&self) -> &Application {
        &self.inner.application
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// State scoped to this request.
    #[must_use]
    pub fn local(&self) -> &Local {
        &self.inner.local
    }

    #[must_use]
    pub fn routing(&self) -> &Routing {
        &self.inner.routing
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.inner.application.settings()
    }

    #[must_use]
    pub fn log(&self) -> &Channel {
        self.inner.application.log()
    }

    /// The rule the request matched.
    #[must_use]
    pub fn url_rule(&self) -> Option<&Rule> {
        match &self.inner.routing {
            Routing::Matched(m) => self.inner.application.url_map().rule(m.index),
            _ => None,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.url_rule()?.endpoint_name()
    }

    /// Placeholder values of the matched rule.
    #[must_use]
    pub fn segments(&self) -> &Segments {
        match &self.inner.routing {
            Routing::Matched(m) => &m.segments,
            _ => &NO_SEGMENTS,
        }
    }

    /// Expands relative endpoint names.
    ///
    /// `.views:index` is relative to the application module and `:index` to the module of
    /// the current endpoint. Other names are returned as they are.
    #[must_use]
    pub fn absolute_endpoint(&self, name: &str) -> String {
        if name.starts_with('.') {
            return format!("{}{name}", self.inner.application.module());
        }
        if name.starts_with(':')
            && let Some((module, _)) = self.endpoint().and_then(|e| e.split_once(':'))
        {
            return format!("{module}{name}");
        }
        name.to_owned()
    }

    /// Builds a URL for `endpoint`, or for the current endpoint when `None`.
    ///
    /// For the current endpoint, the current segments are used with `values` on top.
    /// URLs are made external when `force_external` is set or when the rule belongs to
    /// another subdomain than the request.
    ///
    /// # Errors
    /// [`Error::Build`] when no rule can be filled, including when `endpoint` is `None`
    /// outside of a matched request.
    pub fn build_url(
        &self,
        endpoint: Option<&str>,
        values: impl Into<Values>,
        method: Option<&str>,
        force_external: bool,
        append_unknown: bool,
    ) -> Result<String, Error> {
        let mut values = values.into();
        let endpoint = match endpoint {
            Some(name) => {
                let name = self.absolute_endpoint(name);
                self.inner.application.update_endpoint_values(self, &name, &mut values);
                name
            },
            None => {
                let current = self
                    .endpoint()
                    .ok_or_else(|| Error::build("No current endpoint to build a URL for"))?;
                let mut merged = self.segments().to_values();
                merged.append(&mut values);
                values = merged;
                current.to_owned()
            },
        };

        let built = self.inner.application.url_map().build(&endpoint, &values, method, append_unknown)?;
        let current_subdomain = self.request_subdomain();
        let other_subdomain = current_subdomain.is_some()
            && built.subdomain.unwrap_or("") != current_subdomain.as_deref().unwrap_or("");

        if !(force_external || other_subdomain) {
            return Ok(built.path);
        }

        let scheme = self.inner.request.uri().scheme_str().unwrap_or("http");
        let server_name = self.settings().server.server_name.as_deref();
        let host = match (built.subdomain.filter(|s| !s.is_empty()), server_name) {
            (Some(sub), Some(server)) => format!("{sub}.{server}"),
            (_, Some(server)) => server.to_owned(),
            (_, None) => self.inner.request.header(header::HOST.as_str()).unwrap_or("localhost").to_owned(),
        };
        Ok(format!("{scheme}://{host}{}", built.path))
    }

    /// Absolute path of `endpoint`.
    ///
    /// # Errors
    /// See [`Environment::build_url`].
    pub fn path(&self, endpoint: &str, values: impl Into<Values>) -> Result<String, Error> {
        self.build_url(Some(endpoint), values, None, false, true)
    }

    /// External URL of `endpoint`.
    ///
    /// # Errors
    /// See [`Environment::build_url`].
    pub fn url(&self, endpoint: &str, values: impl Into<Values>) -> Result<String, Error> {
        self.build_url(Some(endpoint), values, None, true, true)
    }

    /// A `302` redirect to `endpoint`.
    ///
    /// # Errors
    /// See [`Environment::build_url`].
    pub fn redirect(&self, endpoint: &str, values: impl Into<Values>) -> Result<Response, Error> {
        Ok(Response::redirect(&self.path(endpoint, values)?))
    }

    /// Renders `name` with the renderer registered for its extension.
    ///
    /// # Errors
    /// [`Error::Render`] for unknown renderers or contexts that are not maps, and whatever
    /// the renderer fails with.
    pub fn render<C: Serialize + ?Sized>(&self, name: &str, context: &C) -> Result<Response, Error> {
        self.inner.application.render(self, name, context)
    }

    /// The subdomain of the request, `None` when no server name is configured.
    #[must_use]
    pub fn request_subdomain(&self) -> Option<String> {
        subdomain_of(self.settings(), self.inner.request.host())
    }
}
