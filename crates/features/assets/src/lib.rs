//! # Assets
//!
//! [`SharedData`] serves the static directory, and any extra directories, straight from the
//! router. Static requests do not run through the component bracket.
//!
//! The component also adds a build-only rule for the `static` endpoint, so templates and
//! handlers can link files with `path("static", name="css/site.css")`.

use ramverk_kernel::axum::Router;
use ramverk_kernel::domain::config::Settings;
use ramverk_kernel::domain::constants::{STATIC_ENDPOINT, STATIC_FILENAME};
use ramverk_kernel::{ApplicationBuilder, Component, Error, Rule};
use std::path::PathBuf;
use tower_http::services::ServeDir;

/// Serves directories under URL prefixes.
#[derive(Debug, Clone, Default)]
pub struct SharedData {
    mounts: Vec<(String, PathBuf)>,
}

impl SharedData {
    /// Serves `storage.static_dir` under `storage.static_path`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also serves `dir` under `prefix`.
    #[must_use]
    pub fn mount(mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.mounts.push((prefix.into(), dir.into()));
        self
    }

    fn mounts<'a>(&'a self, settings: &'a Settings) -> impl Iterator<Item = (&'a str, &'a PathBuf)> + 'a {
        std::iter::once((settings.storage.static_path.as_str(), &settings.storage.static_dir))
            .chain(self.mounts.iter().map(|(prefix, dir)| (prefix.as_str(), dir)))
    }
}

/// `prefix` without its trailing slash, `None` for the root or relative prefixes.
fn mount_point(prefix: &str) -> Option<&str> {
    let trimmed = prefix.trim_end_matches('/');
    (trimmed.starts_with('/') && trimmed.len() > 1).then_some(trimmed)
}

impl Component for SharedData {
    fn name(&self) -> &'static str {
        "shared-data"
    }

    fn setup(&self, builder: &mut ApplicationBuilder) -> Result<(), Error> {
        for (prefix, _) in self.mounts(builder.settings()) {
            if mount_point(prefix).is_none() {
                return Err(Error::routing(format!("Cannot serve files under `{prefix}`")));
            }
        }

        let Some(static_path) = mount_point(&builder.settings().storage.static_path).map(str::to_owned) else {
            return Ok(());
        };
        let rule = Rule::new(format!("{static_path}/{{*{STATIC_FILENAME}}}")).endpoint(STATIC_ENDPOINT).build_only();
        builder.add_rule(rule)
    }

    fn wrap_router(&self, mut router: Router, settings: &Settings) -> Router {
        for (prefix, dir) in self.mounts(settings) {
            if let Some(point) = mount_point(prefix) {
                tracing::debug!(mount = point, dir = %dir.display(), "Serving shared data");
                router = router.nest_service(point, ServeDir::new(dir));
            }
        }
        router
    }
}
