//! Endpoints and handlers.
//!
//! Any async function whose arguments are [`FromEnvironment`] and whose output is
//! [`IntoReply`] is a [`Handler`]. Handlers and [`Resource`]s become type-erased
//! [`Endpoint`]s when they are registered.

use crate::domain::methods::MethodSet;
use crate::environment::Environment;
use crate::error::Error;
use crate::extract::FromEnvironment;
use crate::response::Response;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

pub type EndpointFuture = BoxFuture<'static, Result<Response, Error>>;

/// A named target of URL rules.
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, env: Environment) -> EndpointFuture;

    /// Methods the endpoint handles, applied to rules routed to it without methods.
    fn methods(&self) -> Option<MethodSet> {
        None
    }
}

/// Values a handler may return.
pub trait IntoReply {
    /// # Errors
    /// Returned errors answer the request like errors raised by the handler.
    fn into_reply(self) -> Result<Response, Error>;
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Response, Error> {
        Ok(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Response, Error> {
        Ok(Response::new(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Response, Error> {
        Ok(Response::new(self))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Response, Error> {
        Ok(Response::default())
    }
}

impl<R: IntoReply, E: Into<Error>> IntoReply for Result<R, E> {
    fn into_reply(self) -> Result<Response, Error> {
        self.map_err(Into::into).and_then(IntoReply::into_reply)
    }
}

/// An async function usable as an endpoint. `Args` is the tuple of its argument types.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    fn call(&self, env: Environment) -> EndpointFuture;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoReply,
            $($ty: FromEnvironment,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, env: Environment) -> EndpointFuture {
                let handler = self.clone();
                Box::pin(async move {
                    $(let $ty = $ty::from_environment(&env)?;)*
                    handler($($ty),*).await.into_reply()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

struct HandlerEndpoint<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H: Handler<Args>, Args: 'static> Endpoint for HandlerEndpoint<H, Args> {
    fn call(&self, env: Environment) -> EndpointFuture {
        self.handler.call(env)
    }
}

/// Conversion into a registered endpoint. `M` only disambiguates the implementations.
pub trait IntoEndpoint<M> {
    fn into_endpoint(self) -> Arc<dyn Endpoint>;
}

#[doc(hidden)]
#[derive(Debug)]
pub enum HandlerMarker {}

#[doc(hidden)]
#[derive(Debug)]
pub enum EndpointMarker {}

impl<H: Handler<Args>, Args: 'static> IntoEndpoint<(HandlerMarker, Args)> for H {
    fn into_endpoint(self) -> Arc<dyn Endpoint> {
        handler_endpoint(self)
    }
}

fn handler_endpoint<H: Handler<Args>, Args: 'static>(handler: H) -> Arc<dyn Endpoint> {
    Arc::new(HandlerEndpoint { handler, _args: PhantomData })
}

impl IntoEndpoint<EndpointMarker> for Arc<dyn Endpoint> {
    fn into_endpoint(self) -> Arc<dyn Endpoint> {
        self
    }
}

impl IntoEndpoint<EndpointMarker> for Resource {
    fn into_endpoint(self) -> Arc<dyn Endpoint> {
        Arc::new(self)
    }
}

/// Dispatches to one handler per HTTP method.
///
/// `HEAD` falls back to the `GET` handler. Other methods without a handler answer
/// `405 Method Not Allowed`.
///
/// ```rust
/// use ramverk_kernel::{Resource, Endpoint};
/// use ramverk_kernel::domain::methods::MethodSet;
///
/// let resource = Resource::new()
///     .get(|| async { "list" })
///     .post(|| async { "created" });
/// assert_eq!(resource.methods(), Some(MethodSet::GET | MethodSet::HEAD | MethodSet::POST));
/// ```
#[derive(Clone, Default)]
pub struct Resource {
    handlers: Vec<(MethodSet, Arc<dyn Endpoint>)>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("methods", &self.allowed()).finish()
    }
}

macro_rules! resource_method {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Handles `", stringify!($method), "` requests.")]
            #[must_use]
            pub fn $name<H: Handler<Args>, Args: 'static>(self, handler: H) -> Self {
                self.on(MethodSet::$method, handler)
            }
        )*
    };
}

impl Resource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles every method in `methods` with `handler`.
    #[must_use]
    pub fn on<H: Handler<Args>, Args: 'static>(mut self, methods: MethodSet, handler: H) -> Self {
        self.handlers.push((methods, handler_endpoint(handler)));
        self
    }

    resource_method! {
        get => GET,
        head => HEAD,
        post => POST,
        put => PUT,
        delete => DELETE,
        options => OPTIONS,
        patch => PATCH,
    }

    fn allowed(&self) -> MethodSet {
        self.handlers.iter().fold(MethodSet::empty(), |acc, (m, _)| acc | *m).normalized()
    }

    fn find(&self, method: MethodSet) -> Option<&Arc<dyn Endpoint>> {
        if method.is_empty() {
            return None;
        }
        let exact = self.handlers.iter().find(|(m, _)| m.contains(method));
        let fallback = || {
            (method == MethodSet::HEAD)
                .then(|| self.handlers.iter().find(|(m, _)| m.contains(MethodSet::GET)))
                .flatten()
        };
        exact.or_else(fallback).map(|(_, endpoint)| endpoint)
    }
}

impl Endpoint for Resource {
    fn call(&self, env: Environment) -> EndpointFuture {
        let method = env.request().method().clone();
        match self.find(MethodSet::from_name(method.as_str())) {
            Some(endpoint) => endpoint.call(env),
            None => {
                let err = Error::method_not_allowed(method.as_str(), self.allowed());
                Box::pin(std::future::ready(Err(err)))
            },
        }
    }

    fn methods(&self) -> Option<MethodSet> {
        Some(self.allowed())
    }
}
