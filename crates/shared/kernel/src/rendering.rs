use crate::application::ApplicationBuilder;
use crate::component::Component;
use crate::domain::constants::JSON_RENDERER;
use crate::environment::Environment;
use crate::error::Error;
use crate::response::Response;
use fxhash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Values passed to a renderer.
pub type Context = serde_json::Map<String, Value>;

/// Adds defaults to template contexts before rendering.
pub type ContextProcessor = Arc<dyn Fn(&Environment, &mut Context) -> Result<(), Error> + Send + Sync>;

/// Turns a named template or format and a context into a response.
pub trait Renderer: Send + Sync + 'static {
    /// # Errors
    /// Renderer specific failures, normally [`Error::Render`].
    fn render(&self, env: &Environment, name: &str, context: Context) -> Result<Response, Error>;
}

/// The renderer key of `name`: everything from its first dot, or the whole name.
///
/// `index.html` is rendered by `.html`, `json` by `json`.
#[must_use]
pub fn renderer_key(name: &str) -> &str {
    name.find('.').map_or(name, |dot| &name[dot..])
}

/// Converts a serializable value into a render context.
///
/// # Errors
/// [`Error::Render`] when the value is neither a map nor unit.
pub fn to_context<C: Serialize + ?Sized>(context: &C) -> Result<Context, Error> {
    match serde_json::to_value(context)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Context::new()),
        other => Err(Error::render(format!("Render context must be a map, got `{other}`"))),
    }
}

/// Renderers keyed by extension.
#[derive(Clone, Default)]
pub struct Renderers {
    by_key: FxHashMap<String, Arc<dyn Renderer>>,
}

impl fmt::Debug for Renderers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.by_key.keys().collect();
        keys.sort();
        f.debug_struct("Renderers").field("keys", &keys).finish()
    }
}

impl Renderers {
    /// Registers `renderer` for `key`, replacing a previous one.
    pub fn insert(&mut self, key: impl Into<String>, renderer: Arc<dyn Renderer>) {
        self.by_key.insert(key.into(), renderer);
    }

    /// The renderer for the template or format `name`.
    ///
    /// # Errors
    /// [`Error::Render`] when nothing is registered for its key.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Renderer>, Error> {
        let key = renderer_key(name);
        self.by_key.get(key).ok_or_else(|| Error::render(format!("No renderer for `{key}` ({name})")))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}

#[derive(Debug)]
struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, _env: &Environment, _name: &str, context: Context) -> Result<Response, Error> {
        Response::json(&context)
    }
}

/// Registers the `json` renderer, which answers with the context as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRendering;

impl Component for JsonRendering {
    fn name(&self) -> &'static str {
        "json"
    }

    fn setup(&self, builder: &mut ApplicationBuilder) -> Result<(), Error> {
        builder.add_renderer(JSON_RENDERER, Arc::new(JsonRenderer));
        Ok(())
    }
}
