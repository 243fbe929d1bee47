//! The application: settings, rules, endpoints and the component stack.

mod builder;

pub use builder::ApplicationBuilder;

use crate::component::{Component, Next, Outcome};
use crate::domain::config::Settings;
use crate::domain::registry::Extension;
use crate::endpoint::Endpoint;
use crate::environment::Environment;
use crate::error::Error;
use crate::local;
use crate::log::Channel;
use crate::rendering::{Context, ContextProcessor, Renderers, to_context};
use crate::request::{Request, strip_port};
use crate::response::Response;
use crate::routing::{Routing, Rule, UrlMap, Values};
use axum::Router;
use axum::extract::{RawPathParams, rejection::RawPathParamsRejection};
use axum::http::header;
use axum::routing::any;
use fxhash::FxHashMap;
use crate::domain::registry::Extensions;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Adjusts the values used to build URLs for an endpoint.
pub type EndpointValuesHook = Arc<dyn Fn(&Environment, &str, &mut Values) + Send + Sync>;

/// Turns HTTP and internal errors into responses.
pub type ErrorHandler = Arc<dyn Fn(&Environment, &Error) -> Response + Send + Sync>;

pub(crate) struct ApplicationInner {
    settings: Settings,
    log: Channel,
    url_map: UrlMap,
    endpoints: FxHashMap<String, Arc<dyn Endpoint>>,
    components: Vec<Arc<dyn Component>>,
    renderers: Renderers,
    context_processors: Vec<ContextProcessor>,
    extensions: Extensions,
    endpoint_values: Vec<EndpointValuesHook>,
    error_handler: Option<ErrorHandler>,
}

/// A built application. Cheap to clone.
///
/// ```rust
/// use ramverk_kernel::{Application, Request, routing};
/// use ramverk_kernel::domain::config::Settings;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), ramverk_kernel::Error> {
/// let app = Application::builder(Settings::named("Hello"))
///     .route(routing::get("/").endpoint("index"), || async { "Hello" })
///     .build()?;
///
/// let path = app
///     .contextbound(Request::get("/")?, |env| async move { env.path("index", ()) })
///     .await?;
/// assert_eq!(path, "/");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<ApplicationInner>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<_> = self.inner.components.iter().map(|c| c.name()).collect();
        f.debug_struct("Application")
            .field("name", &self.name())
            .field("module", &self.module())
            .field("rules", &self.inner.url_map.len())
            .field("components", &components)
            .finish_non_exhaustive()
    }
}

impl Application {
    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder::new(settings)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.settings.name
    }

    /// Module that `.relative` endpoint names expand against.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.settings.module
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    #[must_use]
    pub fn log(&self) -> &Channel {
        &self.inner.log
    }

    #[must_use]
    pub fn url_map(&self) -> &UrlMap {
        &self.inner.url_map
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.inner.url_map.rules()
    }

    #[must_use]
    pub fn extension<T: Extension>(&self) -> Option<&T> {
        self.inner.extensions.get::<T>()
    }

    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<&Arc<dyn Endpoint>> {
        self.inner.endpoints.get(name)
    }

    /// Names of the installed components in installation order.
    pub fn components(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.components.iter().map(|c| c.name())
    }

    pub(crate) fn update_endpoint_values(&self, env: &Environment, endpoint: &str, values: &mut Values) {
        for hook in &self.inner.endpoint_values {
            hook(env, endpoint, values);
        }
    }

    /// Renders `name` with the renderer registered for its key.
    ///
    /// # Errors
    /// See [`Environment::render`].
    pub fn render<C: Serialize + ?Sized>(
        &self,
        env: &Environment,
        name: &str,
        context: &C,
    ) -> Result<Response, Error> {
        let context = to_context(context)?;
        self.inner.renderers.get(name)?.render(env, name, context)
    }

    /// Runs the context processors and lays `context` over their defaults.
    ///
    /// # Errors
    /// The first failing processor's error.
    pub fn template_context(&self, env: &Environment, context: Context) -> Result<Context, Error> {
        let mut merged = Context::new();
        for processor in &self.inner.context_processors {
            processor(env, &mut merged)?;
        }
        merged.extend(context);
        Ok(merged)
    }

    #[must_use]
    pub fn error_response(&self, env: &Environment, err: &Error) -> Response {
        self.inner.error_handler.as_ref().map_or_else(|| Response::from_error(err), |handler| handler(env, err))
    }

    /// Calls the endpoint of the matched rule.
    ///
    /// # Errors
    /// [`Error::NotFound`] or [`Error::MethodNotAllowed`] when nothing matched, an internal
    /// error when the rule's endpoint is not registered, and whatever the endpoint fails
    /// with.
    pub async fn dispatch_to_endpoint(&self, env: &Environment) -> Result<Response, Error> {
        let path = env.request().path();
        match env.routing() {
            Routing::Matched(_) => {},
            Routing::MethodNotAllowed(allowed) => {
                return Err(Error::method_not_allowed(env.request().method().as_str(), *allowed));
            },
            Routing::NotFound | Routing::Unrouted => return Err(Error::not_found(path)),
        }
        let name = env.endpoint().ok_or_else(|| Error::not_found(path))?;
        let endpoint = self
            .endpoint(name)
            .ok_or_else(|| Error::from(format!("Endpoint `{name}` is not registered")))?;
        endpoint.call(env.clone()).await
    }

    /// Handles one HTTP request routed to `routing`.
    pub async fn handle(&self, request: axum::extract::Request, routing: Routing) -> Response {
        let request = match Request::from_http(request).await {
            Ok(request) => request,
            Err(err) => return Response::from_error(&err),
        };
        let env = Environment::new(self.clone(), request, routing);
        local::bind(env.clone(), self.respond(&env)).await
    }

    /// The request bracket: enter, respond, exit.
    async fn respond(&self, env: &Environment) -> Response {
        if let Err(err) = self.enter(env).await {
            return self.error_response(env, &err);
        }

        let (mut response, outcome) = match Next::new(self, &self.inner.components).run(env).await {
            Ok(response) => (response, Outcome::Completed),
            Err(err) if err.is_http() => (self.error_response(env, &err), Outcome::Completed),
            Err(err) => {
                self.log().error(format!("{} {} failed: {err}", env.request().method(), env.request().path()));
                (self.error_response(env, &err), Outcome::Failed)
            },
        };

        if let Err(err) = self.exit(env, &self.inner.components, outcome).await {
            response = self.error_response(env, &Error::internal(err));
        }
        response
    }

    /// Enters every component. On failure the ones already entered are exited.
    async fn enter(&self, env: &Environment) -> Result<(), Error> {
        let components = &self.inner.components;
        for (index, component) in components.iter().enumerate() {
            if let Err(err) = component.enter(env).await {
                self.log().error(format!("Entering `{}` failed: {err}", component.name()));
                let _ = self.exit(env, &components[..index], Outcome::Failed).await;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Exits `components` in reverse order. Every component is exited; the first error is
    /// returned.
    async fn exit(&self, env: &Environment, components: &[Arc<dyn Component>], outcome: Outcome) -> Result<(), Error> {
        let mut first = None;
        for component in components.iter().rev() {
            if let Err(err) = component.exit(env, outcome).await {
                self.log().error(format!("Exiting `{}` failed: {err}", component.name()));
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Runs `f` inside the bracket of a request without routing or dispatching it.
    ///
    /// # Errors
    /// The error of `f`, an `enter` failure, or an `exit` failure, in that order.
    pub async fn contextbound<F, Fut, T>(&self, request: Request, f: F) -> Result<T, Error>
    where
        F: FnOnce(Environment) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let env = Environment::new(self.clone(), request, Routing::Unrouted);
        local::bind(env.clone(), async {
            self.enter(&env).await?;
            let result = f(env.clone()).await;
            let outcome = match &result {
                Err(err) if !err.is_http() => Outcome::Failed,
                _ => Outcome::Completed,
            };
            let exited = self.exit(&env, &self.inner.components, outcome).await;
            let value = result?;
            exited.map(|()| value)
        })
        .await
    }

    /// The axum router serving this application.
    ///
    /// Rules sharing a path become one route that picks the rule by subdomain and method;
    /// unmatched requests still run through the components and end as `404`.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for group in self.inner.url_map.route_groups() {
            let app = self.clone();
            let rules: Arc<[usize]> = group.rules.into();
            let route = move |params: Result<RawPathParams, RawPathParamsRejection>,
                              request: axum::extract::Request| {
                let app = app.clone();
                let rules = Arc::clone(&rules);
                async move {
                    let params: Vec<String> = params
                        .map(|p| p.iter().map(|(_, value)| value.to_owned()).collect())
                        .unwrap_or_default();
                    let host = request.headers().get(header::HOST).and_then(|v| v.to_str().ok());
                    let subdomain = subdomain_of(app.settings(), host.map(strip_port));
                    let routing = app.url_map().select(
                        &rules,
                        &params,
                        subdomain.as_deref(),
                        request.method().as_str(),
                    );
                    app.handle(request, routing).await
                }
            };
            router = router.route(&group.path, any(route));
        }

        let app = self.clone();
        router = router.fallback(move |request: axum::extract::Request| {
            let app = app.clone();
            async move { app.handle(request, Routing::NotFound).await }
        });

        for component in &self.inner.components {
            router = component.wrap_router(router, &self.inner.settings);
        }
        router.layer(TraceLayer::new_for_http())
    }
}

/// Subdomain of `host` below the configured server name.
///
/// `None` when no server name is configured. Hosts outside of the server name give
/// `<invalid>`, which no rule matches.
pub(crate) fn subdomain_of(settings: &Settings, host: Option<&str>) -> Option<String> {
    let server = strip_port(settings.server.server_name.as_deref()?).to_ascii_lowercase();
    let Some(host) = host.map(str::to_ascii_lowercase) else {
        return Some(String::new());
    };
    if host == server {
        return Some(String::new());
    }
    let sub = host.strip_suffix(&server).and_then(|s| s.strip_suffix('.'));
    Some(sub.map_or_else(|| "<invalid>".to_owned(), str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(server_name: Option<&str>) -> Settings {
        let mut settings = Settings::default();
        settings.server.server_name = server_name.map(str::to_owned);
        settings
    }

    #[test]
    fn subdomains_need_a_server_name() {
        assert_eq!(subdomain_of(&settings(None), Some("api.example.org")), None);

        let s = settings(Some("example.org:8008"));
        assert_eq!(subdomain_of(&s, Some("api.example.org")).as_deref(), Some("api"));
        assert_eq!(subdomain_of(&s, Some("Example.org")).as_deref(), Some(""));
        assert_eq!(subdomain_of(&s, None).as_deref(), Some(""));
        assert_eq!(subdomain_of(&s, Some("other.net")).as_deref(), Some("<invalid>"));
    }
}
