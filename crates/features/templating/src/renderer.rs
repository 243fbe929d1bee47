use crate::error::{TemplatingError, TemplatingErrorExt};
use minijinja::value::{Kwargs, Value};
use minijinja::{ErrorKind, path_loader};
use ramverk_kernel::rendering::Context;
use ramverk_kernel::{Environment, Error, Renderer, Response, Values, local};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// The template engine environment.
pub type Jinja = minijinja::Environment<'static>;

/// Called for every new template environment, to add filters, tests and globals.
pub type EnvironmentHook = Arc<dyn Fn(&mut Jinja) + Send + Sync>;

/// Renders templates loaded from a directory.
pub(crate) struct TemplateRenderer {
    dir: PathBuf,
    reload: bool,
    hooks: Arc<[EnvironmentHook]>,
    cached: OnceLock<Jinja>,
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("dir", &self.dir)
            .field("reload", &self.reload)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    pub(crate) fn new(dir: PathBuf, reload: bool, hooks: Arc<[EnvironmentHook]>) -> Self {
        Self { dir, reload, hooks, cached: OnceLock::new() }
    }

    fn environment(&self) -> Jinja {
        let mut jinja = Jinja::new();
        jinja.set_loader(path_loader(&self.dir));
        jinja.add_function("path", path);
        jinja.add_function("url", url);
        for hook in self.hooks.iter() {
            hook(&mut jinja);
        }
        jinja
    }

    /// Runs `f` on the cached environment, or on a fresh one when reloading.
    fn with_environment<R>(&self, f: impl FnOnce(&Jinja) -> R) -> R {
        if self.reload {
            f(&self.environment())
        } else {
            f(self.cached.get_or_init(|| self.environment()))
        }
    }

    fn render_template(&self, name: &str, context: &Context) -> Result<String, TemplatingError> {
        self.with_environment(|jinja| jinja.get_template(name).and_then(|template| template.render(context)))
            .context(format!("Rendering `{name}`"))
    }
}

/// The defaults every template sees, below context processors and caller values.
fn defaults(env: &Environment) -> Context {
    let app = env.application();
    let request = env.request();
    let mut context = Context::new();
    context.insert("app".into(), json!({ "name": app.name(), "module": app.module(), "debug": env.settings().debug }));
    context.insert(
        "request".into(),
        json!({ "method": request.method().as_str(), "path": request.path(), "args": request.args() }),
    );
    context
}

fn mimetype(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        _ => "text/html",
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, env: &Environment, name: &str, context: Context) -> Result<Response, Error> {
        let mut merged = defaults(env);
        merged.extend(env.application().template_context(env, context)?);
        let body = self.render_template(name, &merged)?;
        Ok(Response::new(body).with_mimetype(mimetype(name)))
    }
}

fn kernel_error(err: &Error) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string())
}

fn build(endpoint: &str, kwargs: &Kwargs, external: bool) -> Result<String, minijinja::Error> {
    let env = local::current().map_err(|e| kernel_error(&e))?;
    let mut values = Values::from(());
    let keys: Vec<&str> = kwargs.args().collect();
    for key in keys {
        let value: Value = kwargs.get(key)?;
        values.insert(key.to_owned(), value.to_string());
    }
    env.build_url(Some(endpoint), values, None, external, true).map_err(|e| kernel_error(&e))
}

/// `path(endpoint, **values)` in templates.
fn path(endpoint: &str, kwargs: Kwargs) -> Result<String, minijinja::Error> {
    build(endpoint, &kwargs, false)
}

/// `url(endpoint, **values)` in templates.
fn url(endpoint: &str, kwargs: Kwargs) -> Result<String, minijinja::Error> {
    build(endpoint, &kwargs, true)
}
