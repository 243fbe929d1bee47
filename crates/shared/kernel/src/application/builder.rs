use super::{Application, ApplicationInner, EndpointValuesHook, ErrorHandler};
use crate::component::Component;
use crate::domain::config::Settings;
use crate::domain::registry::{Extension, Extensions, InitializedExtension};
use crate::endpoint::{Endpoint, IntoEndpoint};
use crate::environment::Environment;
use crate::error::{Error, ErrorExt};
use crate::log::Channel;
use crate::rendering::{Context, ContextProcessor, Renderer, Renderers};
use crate::response::Response;
use crate::routing::{Rule, UrlMap, Values};
use crate::scan::{Module, ScanOptions, Scanner};
use fxhash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Collects components, rules and endpoints and builds an [`Application`].
///
/// Fluent methods record their errors and [`ApplicationBuilder::build`] reports the first
/// one. The `add_*` methods, used from component setup and module scans, report errors
/// right away.
#[must_use = "builders do nothing unless you call .build()"]
pub struct ApplicationBuilder {
    settings: Settings,
    url_map: UrlMap,
    endpoints: FxHashMap<String, Arc<dyn Endpoint>>,
    components: Vec<Arc<dyn Component>>,
    renderers: Renderers,
    context_processors: Vec<ContextProcessor>,
    extensions: Extensions,
    endpoint_values: Vec<EndpointValuesHook>,
    error_handler: Option<ErrorHandler>,
    errors: Vec<Error>,
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<_> = self.components.iter().map(|c| c.name()).collect();
        f.debug_struct("ApplicationBuilder")
            .field("name", &self.settings.name)
            .field("rules", &self.url_map.len())
            .field("endpoints", &self.endpoints.len())
            .field("components", &components)
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}

impl ApplicationBuilder {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            settings,
            url_map: UrlMap::new(),
            endpoints: FxHashMap::default(),
            components: Vec::new(),
            renderers: Renderers::default(),
            context_processors: Vec::new(),
            extensions: Extensions::new(),
            endpoint_values: Vec::new(),
            error_handler: None,
            errors: Vec::new(),
        }
    }

    fn record(mut self, result: Result<(), Error>) -> Self {
        if let Err(err) = result {
            self.errors.push(err);
        }
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.settings.module = module.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn component(mut self, component: impl Component) -> Self {
        self.add_component(Arc::new(component));
        self
    }

    /// Routes `rule` to `endpoint`, registered under the rule's endpoint name.
    pub fn route<M>(mut self, rule: Rule, endpoint: impl IntoEndpoint<M>) -> Self {
        let result = self.add_route(rule, endpoint);
        self.record(result)
    }

    /// Registers an endpoint that rules added with [`ApplicationBuilder::rules`] refer to.
    pub fn endpoint<M>(mut self, name: impl Into<String>, endpoint: impl IntoEndpoint<M>) -> Self {
        let result = self.add_endpoint(name, endpoint.into_endpoint());
        self.record(result)
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        let result = rules.into_iter().try_for_each(|rule| self.add_rule(rule));
        self.record(result)
    }

    pub fn renderer(mut self, key: impl Into<String>, renderer: impl Renderer) -> Self {
        self.add_renderer(key, Arc::new(renderer));
        self
    }

    pub fn context_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&Environment, &mut Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.add_context_processor(Arc::new(processor));
        self
    }

    pub fn extension<T: Extension>(mut self, extension: T) -> Self {
        let result = self.add_extension(extension);
        self.record(result)
    }

    /// Hook adjusting the values of every URL built by endpoint name.
    pub fn endpoint_values<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Environment, &str, &mut Values) + Send + Sync + 'static,
    {
        self.endpoint_values.push(Arc::new(hook));
        self
    }

    /// Replaces the default error pages.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Environment, &Error) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Registers everything `module` declares.
    pub fn scan(self, module: &dyn Module) -> Self {
        self.scan_with(module, ScanOptions::default())
    }

    pub fn scan_with(mut self, module: &dyn Module, options: ScanOptions) -> Self {
        let result = self.add_scan(module, options);
        self.record(result)
    }

    pub fn add_component(&mut self, component: Arc<dyn Component>) {
        self.components.push(component);
    }

    /// Routes `rule` to `endpoint`. Rules without methods take the endpoint's methods.
    ///
    /// # Errors
    /// [`Error::Routing`] for rules without an endpoint name, invalid patterns and
    /// endpoint names already registered.
    pub fn add_route<M>(&mut self, mut rule: Rule, endpoint: impl IntoEndpoint<M>) -> Result<(), Error> {
        let endpoint = endpoint.into_endpoint();
        let name = rule
            .endpoint_name()
            .ok_or_else(|| Error::routing(format!("Rule `{}` has no endpoint", rule.pattern())))?
            .to_owned();
        rule.set_methods_if_unset(endpoint.methods());
        rule.parts()?;
        self.add_endpoint(name, endpoint)?;
        self.add_rule(rule)
    }

    /// # Errors
    /// [`Error::Routing`] when `name` is already registered.
    pub fn add_endpoint(&mut self, name: impl Into<String>, endpoint: Arc<dyn Endpoint>) -> Result<(), Error> {
        let name = name.into();
        if self.endpoints.contains_key(&name) {
            return Err(Error::routing(format!("Endpoint `{name}` is registered twice")));
        }
        self.endpoints.insert(name, endpoint);
        Ok(())
    }

    /// # Errors
    /// [`Error::Routing`] for invalid rules.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), Error> {
        self.url_map.add(rule)
    }

    pub fn add_renderer(&mut self, key: impl Into<String>, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(key, renderer);
    }

    pub fn add_context_processor(&mut self, processor: ContextProcessor) {
        self.context_processors.push(processor);
    }

    /// # Errors
    /// Fails when an extension of the same type is installed.
    pub fn add_extension<T: Extension>(&mut self, extension: T) -> Result<(), Error> {
        if self.extensions.insert(InitializedExtension::new(extension)) {
            Ok(())
        } else {
            Err(Error::from(format!("Extension `{}` is installed twice", std::any::type_name::<T>())))
        }
    }

    /// # Errors
    /// The first error of the module's registrations.
    pub fn add_scan(&mut self, module: &dyn Module, options: ScanOptions) -> Result<(), Error> {
        module.register(&mut Scanner::new(self, module.path(), options))
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    #[must_use]
    pub fn extension<T: Extension>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    #[must_use]
    pub const fn url_map(&self) -> &UrlMap {
        &self.url_map
    }

    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name() == name)
    }

    /// Sets up every component and assembles the application.
    ///
    /// # Errors
    /// The first recorded registration error, a failing component setup, or a matchable
    /// rule whose endpoint was never registered.
    pub fn build(mut self) -> Result<Application, Error> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        let mut index = 0;
        while let Some(component) = self.components.get(index).cloned() {
            component.setup(&mut self).context(format!("Setting up `{}`", component.name()))?;
            index += 1;
        }
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        for rule in self.url_map.rules().filter(|r| !r.is_build_only()) {
            let endpoint = rule.endpoint_name().unwrap_or_default();
            if !self.endpoints.contains_key(endpoint) {
                return Err(Error::routing(format!(
                    "Rule `{}` points to unregistered endpoint `{endpoint}`",
                    rule.pattern()
                )));
            }
        }

        let log = Channel::new(self.settings.name.as_str());
        log.debug(format!(
            "built with {} rules, {} endpoints and {} components",
            self.url_map.len(),
            self.endpoints.len(),
            self.components.len()
        ));

        Ok(Application {
            inner: Arc::new(ApplicationInner {
                settings: self.settings,
                log,
                url_map: self.url_map,
                endpoints: self.endpoints,
                components: self.components,
                renderers: self.renderers,
                context_processors: self.context_processors,
                extensions: self.extensions,
                endpoint_values: self.endpoint_values,
                error_handler: self.error_handler,
            }),
        })
    }
}
