//! # Templating
//!
//! The [`Templates`] component renders `.html`, `.xml` and `.txt` templates with `minijinja`,
//! loading them from the configured templates directory. Every template sees:
//!
//! * `app` with the application's `name`, `module` and `debug` flag,
//! * `request` with the `method`, `path` and query `args` of the request,
//! * `path(endpoint, **values)` and `url(endpoint, **values)` to build URLs,
//!
//! then the values of the context processors and finally what the caller passed.
//!
//! ```rust,no_run
//! use ramverk_kernel::domain::config::Settings;
//! use ramverk_kernel::{Application, Environment, Error, Response, routing};
//! use ramverk_templating::Templates;
//! use serde_json::json;
//!
//! async fn index(env: Environment) -> Result<Response, Error> {
//!     env.render("index.html", &json!({ "greeting": "Hello" }))
//! }
//!
//! let templates = Templates::new().on_environment(|jinja| {
//!     jinja.add_filter("shout", |value: String| value.to_uppercase());
//! });
//! let app: Result<Application, Error> = Application::builder(Settings::named("Greeter"))
//!     .component(templates)
//!     .route(routing::get("/").endpoint("index"), index)
//!     .build();
//! ```

mod error;
mod renderer;

pub use error::{TemplatingError, TemplatingErrorExt};
pub use renderer::{EnvironmentHook, Jinja};

use ramverk_kernel::{ApplicationBuilder, Component, Error};
use renderer::TemplateRenderer;
use std::path::PathBuf;
use std::sync::Arc;

/// Template extensions rendered by [`Templates`].
pub const TEMPLATE_EXTENSIONS: [&str; 3] = [".html", ".xml", ".txt"];

/// Registers the template renderers.
///
/// In debug mode templates are reloaded for every render, otherwise they are loaded once.
#[derive(Default)]
pub struct Templates {
    dir: Option<PathBuf>,
    hooks: Vec<EnvironmentHook>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").field("dir", &self.dir).field("hooks", &self.hooks.len()).finish()
    }
}

impl Templates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads templates from `dir` instead of `storage.templates_dir`.
    #[must_use]
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Adds a hook run on every new template environment.
    #[must_use]
    pub fn on_environment<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Jinja) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }
}

impl Component for Templates {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn setup(&self, builder: &mut ApplicationBuilder) -> Result<(), Error> {
        let settings = builder.settings();
        let dir = self.dir.clone().unwrap_or_else(|| settings.storage.templates_dir.clone());
        tracing::debug!(dir = %dir.display(), reload = settings.debug, "Template directory");

        let renderer = Arc::new(TemplateRenderer::new(dir, settings.debug, self.hooks.clone().into()));
        for key in TEMPLATE_EXTENSIONS {
            builder.add_renderer(key, renderer.clone());
        }
        Ok(())
    }
}
