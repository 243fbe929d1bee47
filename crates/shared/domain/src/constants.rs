//! Names shared between components.

/// Default application name.
pub const DEFAULT_NAME: &str = "Ramverk";
/// Default root module used to expand `.relative` endpoints.
pub const DEFAULT_MODULE: &str = "app";

/// Endpoint name of the build-only static files rule.
pub const STATIC_ENDPOINT: &str = "static";
/// Placeholder name of the static files rule.
pub const STATIC_FILENAME: &str = "name";

/// Renderer key of the JSON renderer.
pub const JSON_RENDERER: &str = "json";

/// Separator between a module path and an endpoint name.
pub const MODULE_SEPARATOR: char = ':';

/// Environment variable prefix used by the configuration loader.
pub const ENV_PREFIX: &str = "RAMVERK";
