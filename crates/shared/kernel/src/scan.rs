//! Modules declare their endpoints and rules explicitly and are registered by scanning.
//!
//! Endpoint names registered by a module are prefixed with its path, so the module
//! `greeter.frontend` registering `index` creates the endpoint `greeter.frontend:index`.
//! Names already containing `:` are taken as they are.

use crate::application::ApplicationBuilder;
use crate::endpoint::{Handler, IntoEndpoint};
use crate::error::Error;
use crate::routing::{self, Rule};
use serde_json::{Map, Value};

/// A unit of endpoints and rules.
pub trait Module: Send + Sync {
    /// Dotted module path, the prefix of every endpoint the module registers.
    fn path(&self) -> &str;

    /// # Errors
    /// Any registration error fails the scan.
    fn register(&self, scanner: &mut Scanner<'_>) -> Result<(), Error>;
}

/// Options applied to everything registered by one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOptions {
    pub submount: Option<String>,
    pub subdomain: Option<String>,
    pub params: Map<String, Value>,
}

impl ScanOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn submount(mut self, prefix: impl Into<String>) -> Self {
        self.submount = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// A parameter modules can read through [`Scanner::param`].
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

macro_rules! scanner_method {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Routes `", stringify!($name), "` requests for `pattern` to the endpoint `name`.")]
            ///
            /// # Errors
            /// See [`Scanner::route`].
            pub fn $name<H: Handler<Args>, Args: 'static>(
                &mut self,
                pattern: &str,
                name: &str,
                handler: H,
            ) -> Result<&mut Self, Error> {
                self.route(routing::$name(pattern).endpoint(name), handler)
            }
        )*
    };
}

/// Registers a module's declarations on the builder.
#[derive(Debug)]
pub struct Scanner<'a> {
    builder: &'a mut ApplicationBuilder,
    module: String,
    options: ScanOptions,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(builder: &'a mut ApplicationBuilder, module: &str, options: ScanOptions) -> Self {
        Self { builder, module: module.to_owned(), options }
    }

    #[must_use]
    pub fn module_path(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub const fn options(&self) -> &ScanOptions {
        &self.options
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.options.params.get(key)
    }

    pub fn builder(&mut self) -> &mut ApplicationBuilder {
        self.builder
    }

    /// The full endpoint name of `name` in this module.
    #[must_use]
    pub fn endpoint_name(&self, name: &str) -> String {
        if name.contains(':') { name.to_owned() } else { format!("{}:{name}", self.module) }
    }

    fn prepare(&self, mut rule: Rule) -> Rule {
        if let Some(endpoint) = rule.endpoint_name() {
            let endpoint = self.endpoint_name(endpoint);
            rule.set_endpoint(endpoint);
        }
        if let Some(prefix) = &self.options.submount {
            let pattern = format!("{}{}", prefix.trim_end_matches('/'), rule.pattern());
            rule.set_pattern(pattern);
        }
        match &self.options.subdomain {
            Some(sub) if rule.subdomain_name().is_none() => rule.subdomain(sub.as_str()),
            _ => rule,
        }
    }

    /// Routes `rule`, whose endpoint name is relative to the module, to `endpoint`.
    ///
    /// # Errors
    /// See [`ApplicationBuilder::add_route`].
    pub fn route<M>(&mut self, rule: Rule, endpoint: impl IntoEndpoint<M>) -> Result<&mut Self, Error> {
        let rule = self.prepare(rule);
        self.builder.add_route(rule, endpoint)?;
        Ok(self)
    }

    scanner_method!(get, post, put, delete, patch);

    /// Registers an endpoint without rules.
    ///
    /// # Errors
    /// See [`ApplicationBuilder::add_endpoint`].
    pub fn endpoint<M>(&mut self, name: &str, endpoint: impl IntoEndpoint<M>) -> Result<&mut Self, Error> {
        let name = self.endpoint_name(name);
        self.builder.add_endpoint(name, endpoint.into_endpoint())?;
        Ok(self)
    }

    /// Adds rules whose endpoint names are relative to the module.
    ///
    /// # Errors
    /// See [`ApplicationBuilder::add_rule`].
    pub fn rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<&mut Self, Error> {
        for rule in rules {
            let rule = self.prepare(rule);
            self.builder.add_rule(rule)?;
        }
        Ok(self)
    }

    /// Runs a configurator with the scan options.
    ///
    /// # Errors
    /// Whatever `configure` fails with.
    pub fn configure<F>(&mut self, configure: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut ApplicationBuilder, &ScanOptions) -> Result<(), Error>,
    {
        configure(self.builder, &self.options)?;
        Ok(self)
    }

    /// Scans a submodule with the same options.
    ///
    /// # Errors
    /// The first error of the submodule's registrations.
    pub fn scan(&mut self, module: &dyn Module) -> Result<(), Error> {
        let mut nested = Scanner::new(self.builder, module.path(), self.options.clone());
        module.register(&mut nested)
    }
}
