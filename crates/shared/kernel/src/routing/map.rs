use super::rule::{Part, Rule};
use crate::domain::methods::MethodSet;
use crate::error::Error;
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Values used to fill placeholders when building URLs, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values(BTreeMap<String, String>);

impl Values {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }
}

impl Deref for Values {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Values {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<()> for Values {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for Values {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Values {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect())
    }
}

/// Placeholder values of the matched rule, rule defaults included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments(BTreeMap<String, String>);

impl Segments {
    pub(crate) const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Converts the segment `name`.
    ///
    /// # Errors
    /// [`Error::NotFound`] when the segment is missing or does not convert, so that a URL
    /// with a malformed segment behaves like one that never matched.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, Error> {
        self.get(name)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| Error::not_found(format!("segment `{name}`")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments as URL building values.
    #[must_use]
    pub fn to_values(&self) -> Values {
        Values(self.0.clone())
    }
}

/// A rule selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub index: usize,
    pub segments: Segments,
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    Matched(RouteMatch),
    NotFound,
    MethodNotAllowed(MethodSet),
    /// No routing happened, as for [`Application::contextbound`](crate::Application::contextbound).
    Unrouted,
}

/// A built URL path and the subdomain of the rule it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built<'a> {
    pub subdomain: Option<&'a str>,
    pub path: String,
}

#[derive(Debug, Clone)]
struct Entry {
    rule: Rule,
    parts: Vec<Part>,
}

impl Entry {
    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Segment(name) | Part::Rest(name) => Some(name.as_str()),
            Part::Static(_) => None,
        })
    }

    /// Pattern with placeholders renamed by position, so equal shapes share one route.
    fn route_path(&self) -> String {
        let mut out = String::new();
        let mut segment = 0usize;
        let mut in_segment = 0usize;
        for part in &self.parts {
            match part {
                Part::Static(text) => {
                    for c in text.chars() {
                        if c == '/' {
                            segment += 1;
                            in_segment = 0;
                        }
                        out.push(c);
                    }
                },
                Part::Segment(_) => {
                    let _ = write!(out, "{{s{segment}_{in_segment}}}");
                    in_segment += 1;
                },
                Part::Rest(_) => {
                    let _ = write!(out, "{{*s{segment}_rest}}");
                },
            }
        }
        out
    }
}

/// A group of rules sharing one route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGroup {
    pub path: String,
    pub rules: Vec<usize>,
}

/// The rules of an application.
#[derive(Debug, Clone, Default)]
pub struct UrlMap {
    entries: Vec<Entry>,
    by_endpoint: FxHashMap<String, Vec<usize>>,
}

impl UrlMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule after validating its pattern.
    ///
    /// # Errors
    /// Returns [`Error::Routing`] for invalid patterns and rules without an endpoint.
    pub fn add(&mut self, rule: Rule) -> Result<(), Error> {
        let parts = rule.parts()?;
        let Some(endpoint) = rule.endpoint_name() else {
            return Err(Error::routing(format!("Rule `{}` has no endpoint", rule.pattern())));
        };
        self.by_endpoint.entry(endpoint.to_owned()).or_default().push(self.entries.len());
        self.entries.push(Entry { rule, parts });
        Ok(())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter().map(|e| &e.rule)
    }

    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&Rule> {
        self.entries.get(index).map(|e| &e.rule)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether some rule of `endpoint` has the placeholder `key`.
    #[must_use]
    pub fn is_endpoint_expecting(&self, endpoint: &str, key: &str) -> bool {
        self.by_endpoint
            .get(endpoint)
            .is_some_and(|ids| ids.iter().any(|&i| self.entries[i].placeholders().any(|p| p == key)))
    }

    /// Builds the path of `endpoint` from the first of its rules the values can fill.
    ///
    /// Rules restricted to other methods are skipped when `method` is given. Values that
    /// are neither placeholders nor defaults become the query string when
    /// `append_unknown` is set.
    ///
    /// # Errors
    /// [`Error::Build`] when no rule of `endpoint` can be filled.
    pub fn build(
        &self,
        endpoint: &str,
        values: &Values,
        method: Option<&str>,
        append_unknown: bool,
    ) -> Result<Built<'_>, Error> {
        let candidates = self.by_endpoint.get(endpoint).map_or(&[][..], Vec::as_slice);

        for entry in candidates.iter().map(|&i| &self.entries[i]) {
            if method.is_some_and(|m| !entry.rule.allows(m)) {
                continue;
            }
            let defaults = entry.rule.defaults();
            let lookup = |name: &str| values.get(name).or_else(|| defaults.get(name));
            if !entry.placeholders().all(|name| lookup(name).is_some()) {
                continue;
            }

            let mut path = String::new();
            for part in &entry.parts {
                match part {
                    Part::Static(text) => path.push_str(text),
                    Part::Segment(name) => {
                        path.push_str(&urlencoding::encode(lookup(name).map_or("", String::as_str)));
                    },
                    Part::Rest(name) => {
                        let value = lookup(name).map_or("", String::as_str);
                        let encoded: Vec<_> = value.split('/').map(urlencoding::encode).collect();
                        path.push_str(&encoded.join("/"));
                    },
                }
            }

            if append_unknown {
                let mut unknown = values
                    .iter()
                    .filter(|(k, _)| !defaults.contains_key(*k) && !entry.placeholders().any(|p| p == k.as_str()))
                    .peekable();
                if unknown.peek().is_some() {
                    let query = url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(unknown)
                        .finish();
                    path.push('?');
                    path.push_str(&query);
                }
            }

            return Ok(Built { subdomain: entry.rule.subdomain_name(), path });
        }

        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        Err(Error::build(format!(
            "Could not build url for endpoint `{endpoint}` with values {keys:?}"
        )))
    }

    /// Matchable rules grouped by route path, in insertion order.
    #[must_use]
    pub fn route_groups(&self) -> Vec<RouteGroup> {
        let mut groups: Vec<RouteGroup> = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.rule.is_build_only() {
                continue;
            }
            let path = entry.route_path();
            match groups.iter_mut().find(|g| g.path == path) {
                Some(group) => group.rules.push(index),
                None => groups.push(RouteGroup { path, rules: vec![index] }),
            }
        }
        groups
    }

    /// Picks the rule of `rules` for a request.
    ///
    /// `params` are the captured placeholder values in pattern order. When `subdomain` is
    /// `None` subdomains are ignored; otherwise only rules bound to it (rules without a
    /// subdomain are bound to `""`) are considered.
    #[must_use]
    pub fn select(&self, rules: &[usize], params: &[String], subdomain: Option<&str>, method: &str) -> Routing {
        let mut allowed = MethodSet::empty();
        let mut any_candidate = false;

        for &index in rules {
            let Some(entry) = self.entries.get(index) else { continue };
            if let Some(sub) = subdomain
                && entry.rule.subdomain_name().unwrap_or("") != sub
            {
                continue;
            }
            any_candidate = true;
            if !entry.rule.allows(method) {
                allowed |= entry.rule.allowed_methods().unwrap_or_else(MethodSet::all);
                continue;
            }

            let mut segments = entry.rule.defaults().clone();
            for (name, value) in entry.placeholders().zip(params) {
                segments.insert(name.to_owned(), value.clone());
            }
            return Routing::Matched(RouteMatch { index, segments: Segments(segments) });
        }

        if any_candidate { Routing::MethodNotAllowed(allowed) } else { Routing::NotFound }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rules: impl IntoIterator<Item = Rule>) -> UrlMap {
        let mut map = UrlMap::new();
        for rule in rules {
            map.add(rule).unwrap();
        }
        map
    }

    #[test]
    fn builds_with_encoding_and_query() {
        let map = map([
            Rule::new("/greet/{name}").endpoint("greet"),
            Rule::new("/static/{*name}").endpoint("static").build_only(),
        ]);

        let built = map.build("greet", &Values::from([("name", "Ada L"), ("lang", "sv")]), None, true).unwrap();
        assert_eq!(built.path, "/greet/Ada%20L?lang=sv");

        let built = map.build("static", &Values::from([("name", "css/site v2.css")]), None, false).unwrap();
        assert_eq!(built.path, "/static/css/site%20v2.css");

        assert!(matches!(map.build("greet", &Values::new(), None, true), Err(Error::Build { .. })));
        assert!(map.build("missing", &Values::new(), None, true).is_err());
    }

    #[test]
    fn first_satisfiable_rule_wins() {
        let map = map([
            Rule::new("/page/{n}").endpoint("list"),
            Rule::new("/").endpoint("list").default_value("n", "1"),
        ]);
        assert_eq!(map.build("list", &Values::from([("n", 3)]), None, true).unwrap().path, "/page/3");
        assert_eq!(map.build("list", &().into(), None, true).unwrap().path, "/");
        assert!(map.is_endpoint_expecting("list", "n"));
        assert!(!map.is_endpoint_expecting("list", "page"));
    }

    #[test]
    fn method_filter_skips_rules() {
        let map = map([
            Rule::new("/form").endpoint("edit").methods(MethodSet::GET),
            Rule::new("/save").endpoint("edit").methods(MethodSet::POST),
        ]);
        assert_eq!(map.build("edit", &Values::new(), Some("POST"), true).unwrap().path, "/save");
    }

    #[test]
    fn groups_share_shapes() {
        let map = map([
            Rule::new("/").endpoint("index").methods(MethodSet::GET),
            Rule::new("/").endpoint("save").methods(MethodSet::POST),
            Rule::new("/u/{name}").endpoint("user"),
            Rule::new("/u/{id}").endpoint("user_by_id").subdomain("api"),
            Rule::new("/static/{*name}").endpoint("static").build_only(),
        ]);
        let groups = map.route_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], RouteGroup { path: "/".into(), rules: vec![0, 1] });
        assert_eq!(groups[1].path, "/u/{s2_0}");
        assert_eq!(groups[1].rules, vec![2, 3]);
    }

    #[test]
    fn selection_by_method_and_subdomain() {
        let map = map([
            Rule::new("/").endpoint("index").methods(MethodSet::GET),
            Rule::new("/").endpoint("save").methods(MethodSet::POST),
            Rule::new("/").endpoint("api").subdomain("api"),
        ]);
        let rules = [0, 1, 2];

        let Routing::Matched(m) = map.select(&rules, &[], Some(""), "POST") else { panic!() };
        assert_eq!(m.index, 1);
        let Routing::Matched(m) = map.select(&rules, &[], Some("api"), "DELETE") else { panic!() };
        assert_eq!(m.index, 2);
        assert_eq!(
            map.select(&rules, &[], Some(""), "PUT"),
            Routing::MethodNotAllowed(MethodSet::GET | MethodSet::POST)
        );
        assert_eq!(map.select(&rules, &[], Some("www"), "GET"), Routing::NotFound);
    }

    #[test]
    fn selected_segments_include_defaults() {
        let map = map([Rule::new("/u/{name}").endpoint("user").default_value("tab", "home")]);
        let Routing::Matched(m) = map.select(&[0], &["ada".into()], None, "GET") else { panic!() };
        assert_eq!(m.segments.get("name"), Some("ada"));
        assert_eq!(m.segments.get("tab"), Some("home"));
        assert_eq!(m.segments.parse::<String>("name").unwrap(), "ada");
        assert!(m.segments.parse::<u32>("name").is_err());
    }
}
