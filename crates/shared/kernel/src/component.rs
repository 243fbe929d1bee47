//! Components are the building blocks of an application.
//!
//! Each installed component may hook into the build (`setup`, `wrap_router`) and into every
//! request. For a request the hooks run as a bracket:
//!
//! 1. `enter` in installation order,
//! 2. `respond` nested, the first installed component outermost, endpoint dispatch inside,
//! 3. `exit` in reverse installation order.
//!
//! When an `enter` fails, only the components entered before it are exited, with
//! [`Outcome::Failed`].

use crate::application::{Application, ApplicationBuilder};
use crate::domain::config::Settings;
use crate::environment::Environment;
use crate::error::Error;
use crate::response::Response;
use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;

/// How the handling of a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was produced, HTTP error pages included.
    Completed,
    /// Handling failed with an internal error.
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Runs once while the application is built. Components installed from here are set up
    /// after this one.
    ///
    /// # Errors
    /// Fails the build.
    fn setup(&self, _builder: &mut ApplicationBuilder) -> Result<(), Error> {
        Ok(())
    }

    /// Wraps the router, for middleware and nested services.
    fn wrap_router(&self, router: Router, _settings: &Settings) -> Router {
        router
    }

    /// # Errors
    /// Fails the request.
    async fn enter(&self, _env: &Environment) -> Result<(), Error> {
        Ok(())
    }

    /// Produces the response, normally by calling `next`.
    ///
    /// # Errors
    /// HTTP errors become error pages; other errors fail the request.
    async fn respond(&self, env: &Environment, next: Next<'_>) -> Result<Response, Error> {
        next.run(env).await
    }

    /// # Errors
    /// Fails the request even when a response was already produced.
    async fn exit(&self, _env: &Environment, _outcome: Outcome) -> Result<(), Error> {
        Ok(())
    }
}

/// The rest of the respond chain.
pub struct Next<'a> {
    application: &'a Application,
    remaining: &'a [Arc<dyn Component>],
}

impl<'a> Next<'a> {
    pub(crate) const fn new(application: &'a Application, remaining: &'a [Arc<dyn Component>]) -> Self {
        Self { application, remaining }
    }

    /// Calls the next component, or dispatches to the endpoint after the last one.
    ///
    /// # Errors
    /// Whatever the rest of the chain fails with.
    pub async fn run(self, env: &Environment) -> Result<Response, Error> {
        match self.remaining.split_first() {
            Some((component, rest)) => {
                component.respond(env, Next::new(self.application, rest)).await
            },
            None => self.application.dispatch_to_endpoint(env).await,
        }
    }
}
