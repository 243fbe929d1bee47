use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed top-level entry of the database root.
///
/// ```rust
/// use ramverk_database::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Counter {
///     hits: u64,
/// }
///
/// impl Document for Counter {
///     const KEY: &'static str = "counter";
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Root key the document is stored under.
    const KEY: &'static str;
}
