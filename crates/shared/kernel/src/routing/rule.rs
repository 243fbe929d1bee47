use crate::domain::methods::MethodSet;
use crate::error::Error;
use std::collections::BTreeMap;

/// One piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Static(String),
    /// `{name}`: one path segment.
    Segment(String),
    /// `{*name}`: the rest of the path, slashes included.
    Rest(String),
}

/// URL rule binding a pattern to an endpoint name.
///
/// Patterns use the router syntax: `/greet/{name}` captures one segment, `/files/{*path}`
/// captures the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pattern: String,
    endpoint: Option<String>,
    methods: Option<MethodSet>,
    build_only: bool,
    subdomain: Option<String>,
    defaults: BTreeMap<String, String>,
}

impl Rule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            endpoint: None,
            methods: None,
            build_only: false,
            subdomain: None,
            defaults: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Restricts the rule to `methods`. `GET` also allows `HEAD`.
    #[must_use]
    pub fn methods(mut self, methods: impl Into<MethodSet>) -> Self {
        self.methods = Some(methods.into());
        self
    }

    /// The rule is used for building URLs only, never for matching requests.
    #[must_use]
    pub const fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// A value used when building and reported in the segments when matching.
    #[must_use]
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn endpoint_name(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    #[must_use]
    pub const fn allowed_methods(&self) -> Option<MethodSet> {
        self.methods
    }

    #[must_use]
    pub const fn is_build_only(&self) -> bool {
        self.build_only
    }

    #[must_use]
    pub fn subdomain_name(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    #[must_use]
    pub const fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Whether a request with `method` may be routed to this rule.
    #[must_use]
    pub fn allows(&self, method: &str) -> bool {
        self.methods.is_none_or(|m| m.allows(method))
    }

    pub(crate) fn set_methods_if_unset(&mut self, methods: Option<MethodSet>) {
        if self.methods.is_none() {
            self.methods = methods;
        }
    }

    pub(crate) fn set_pattern(&mut self, pattern: String) {
        self.pattern = pattern;
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = Some(endpoint);
    }

    /// Splits the pattern into static text and placeholders.
    ///
    /// # Errors
    /// Returns [`Error::Routing`] for patterns not starting with `/`, unbalanced braces,
    /// invalid or repeated names, and a rest placeholder that is not last.
    pub fn parts(&self) -> Result<Vec<Part>, Error> {
        let pattern = self.pattern.as_str();
        if !pattern.starts_with('/') {
            return Err(Error::routing(format!("Pattern `{pattern}` must start with `/`")));
        }

        let mut parts = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut rest = pattern;
        while !rest.is_empty() {
            let Some(open) = rest.find(['{', '}']) else {
                parts.push(Part::Static(rest.to_owned()));
                break;
            };
            if rest[open..].starts_with('}') {
                return Err(Error::routing(format!("Unbalanced `}}` in `{pattern}`")));
            }
            if open > 0 {
                parts.push(Part::Static(rest[..open].to_owned()));
            }
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                return Err(Error::routing(format!("Unclosed `{{` in `{pattern}`")));
            };
            let inner = &rest[open + 1..close];
            let (name, is_rest) = inner.strip_prefix('*').map_or((inner, false), |n| (n, true));
            if !is_identifier(name) {
                return Err(Error::routing(format!("Invalid placeholder `{inner}` in `{pattern}`")));
            }
            if names.contains(&name) {
                return Err(Error::routing(format!("Placeholder `{name}` repeated in `{pattern}`")));
            }
            names.push(name);
            rest = &rest[close + 1..];
            if is_rest {
                if !rest.is_empty() {
                    return Err(Error::routing(format!("`{{*{name}}}` must end `{pattern}`")));
                }
                parts.push(Part::Rest(name.to_owned()));
            } else {
                parts.push(Part::Segment(name.to_owned()));
            }
        }
        Ok(parts)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An ordered collection of rules that rule factories transform as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self { rules: rules.into_iter().collect() }
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Prefixes every pattern with `prefix`.
    #[must_use]
    pub fn submount(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        for rule in &mut self.rules {
            let pattern = format!("{prefix}{}", rule.pattern());
            rule.set_pattern(pattern);
        }
        self
    }

    /// Binds every rule to `subdomain`.
    #[must_use]
    pub fn subdomain(mut self, subdomain: &str) -> Self {
        for rule in &mut self.rules {
            rule.subdomain = Some(subdomain.to_owned());
        }
        self
    }

    /// Prefixes every endpoint name with `prefix`.
    #[must_use]
    pub fn endpoint_prefix(mut self, prefix: &str) -> Self {
        for rule in &mut self.rules {
            if let Some(endpoint) = rule.endpoint.take() {
                rule.endpoint = Some(format!("{prefix}{endpoint}"));
            }
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl IntoIterator for RuleSet {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        self.rules.extend(iter);
    }
}

/// Mounts `rules` below `prefix`.
pub fn submount(prefix: &str, rules: impl IntoIterator<Item = Rule>) -> RuleSet {
    RuleSet::new(rules).submount(prefix)
}

/// Binds `rules` to `name`.
pub fn subdomain(name: &str, rules: impl IntoIterator<Item = Rule>) -> RuleSet {
    RuleSet::new(rules).subdomain(name)
}

/// Prefixes the endpoints of `rules` with `prefix`.
pub fn endpoint_prefix(prefix: &str, rules: impl IntoIterator<Item = Rule>) -> RuleSet {
    RuleSet::new(rules).endpoint_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_placeholders() {
        let parts = Rule::new("/greet/{name}/files/{*path}").parts().unwrap();
        assert_eq!(
            parts,
            vec![
                Part::Static("/greet/".into()),
                Part::Segment("name".into()),
                Part::Static("/files/".into()),
                Part::Rest("path".into()),
            ]
        );
    }

    #[test]
    fn rejects_invalid_patterns() {
        for pattern in ["greet", "/{name", "/a}", "/{1x}", "/{a}/{a}", "/{*rest}/tail", "/{}"] {
            assert!(Rule::new(pattern).parts().is_err(), "{pattern} should be rejected");
        }
    }

    #[test]
    fn factories_transform_rules() {
        let rules = submount(
            "/api/",
            endpoint_prefix("api.", [Rule::new("/").endpoint("index"), Rule::new("/{id}").endpoint("item")]),
        )
        .subdomain("admin");

        let rules: Vec<Rule> = rules.into_iter().collect();
        assert_eq!(rules[0].pattern(), "/api/");
        assert_eq!(rules[1].pattern(), "/api/{id}");
        assert_eq!(rules[1].endpoint_name(), Some("api.item"));
        assert!(rules.iter().all(|r| r.subdomain_name() == Some("admin")));
    }

    #[test]
    fn method_restrictions() {
        let rule = Rule::new("/").methods(MethodSet::GET);
        assert!(rule.allows("HEAD"));
        assert!(!rule.allows("POST"));
        assert!(Rule::new("/").allows("DELETE"));
    }
}
