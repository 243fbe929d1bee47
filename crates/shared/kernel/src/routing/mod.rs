//! URL rules, rule factories and the URL map.
//!
//! Requests are matched by the axum router; the map keeps the rules so URLs can be built
//! back from endpoint names and so rules sharing a path can be told apart by method and
//! subdomain.

mod map;
mod rule;

pub use map::{Built, RouteGroup, RouteMatch, Routing, Segments, UrlMap, Values};
pub use rule::{Part, Rule, RuleSet, endpoint_prefix, subdomain, submount};

use crate::domain::methods::MethodSet;

macro_rules! shorthand {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("A rule for `", stringify!($method), "` requests to `pattern`.")]
            pub fn $name(pattern: impl Into<String>) -> Rule {
                Rule::new(pattern).methods(MethodSet::$method)
            }
        )*
    };
}

shorthand! {
    get => GET,
    head => HEAD,
    post => POST,
    put => PUT,
    delete => DELETE,
    options => OPTIONS,
    trace => TRACE,
    patch => PATCH,
    connect => CONNECT,
}
