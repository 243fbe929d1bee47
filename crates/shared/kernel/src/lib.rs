//! # Ramverk kernel
//!
//! An [`Application`] is built from cooperating [`Component`]s. Each request gets a fresh
//! [`Environment`] with its own request-local state ([`Local`]), bound on a task-local
//! context stack. Components bracket the request: they are entered in installation order,
//! wrap the response as a chain, and exit in reverse order with the request's
//! [`Outcome`].
//!
//! Endpoints are async functions whose arguments are injected from the environment:
//!
//! ```rust
//! use ramverk_kernel::{Application, Environment, Error, Response, Segments, routing};
//! use ramverk_kernel::domain::config::Settings;
//!
//! async fn greet(segments: Segments) -> Result<String, Error> {
//!     let name: String = segments.parse("name")?;
//!     Ok(format!("Hello, {name}!"))
//! }
//!
//! async fn index(env: Environment) -> Result<Response, Error> {
//!     env.redirect("greet", [("name", "world")])
//! }
//!
//! let app = Application::builder(Settings::named("Hello"))
//!     .route(routing::get("/").endpoint("index"), index)
//!     .route(routing::get("/greet/{name}").endpoint("greet"), greet)
//!     .build()
//!     .unwrap();
//! let router: axum::Router = app.router();
//! # drop(router);
//! ```

extern crate self as ramverk_kernel;

pub mod application;
pub mod component;
pub mod config;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod extract;
pub mod local;
pub mod log;
pub mod rendering;
pub mod request;
pub mod response;
pub mod routing;
pub mod scan;
mod server;

pub use application::{Application, ApplicationBuilder};
pub use component::{Component, Next, Outcome};
pub use endpoint::{Endpoint, Handler, IntoEndpoint, IntoReply, Resource};
pub use environment::Environment;
pub use error::{Error, ErrorExt};
pub use extract::{Args, Ext, Form, FromEnvironment, Json};
pub use local::Local;
pub use log::Channel;
pub use rendering::{Context, JsonRendering, Renderer};
pub use request::{MultiDict, Request};
pub use response::Response;
pub use routing::{Rule, RuleSet, Segments, Values};
pub use scan::{Module, ScanOptions, Scanner};

pub use async_trait::async_trait;
pub use axum;
pub use ramverk_domain as domain;
