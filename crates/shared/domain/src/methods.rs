use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// A set of HTTP methods a rule or endpoint accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MethodSet: u16 {
        const GET = 1 << 0;
        const HEAD = 1 << 1;
        const POST = 1 << 2;
        const PUT = 1 << 3;
        const DELETE = 1 << 4;
        const OPTIONS = 1 << 5;
        const TRACE = 1 << 6;
        const PATCH = 1 << 7;
        const CONNECT = 1 << 8;
    }
}

const NAMES: [(MethodSet, &str); 9] = [
    (MethodSet::GET, "GET"),
    (MethodSet::HEAD, "HEAD"),
    (MethodSet::POST, "POST"),
    (MethodSet::PUT, "PUT"),
    (MethodSet::DELETE, "DELETE"),
    (MethodSet::OPTIONS, "OPTIONS"),
    (MethodSet::TRACE, "TRACE"),
    (MethodSet::PATCH, "PATCH"),
    (MethodSet::CONNECT, "CONNECT"),
];

impl MethodSet {
    /// Parses one method name, case-insensitively. Unknown methods yield the empty set.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map_or_else(Self::empty, |(m, _)| *m)
    }

    /// `GET` implies `HEAD`.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.contains(Self::GET) { self | Self::HEAD } else { self }
    }

    /// Whether a request with the given method name may use this set.
    #[must_use]
    pub fn allows(self, name: &str) -> bool {
        let method = Self::from_name(name);
        !method.is_empty() && self.normalized().contains(method)
    }

    /// Method names in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES.iter().filter(move |(m, _)| self.contains(*m)).map(|(_, n)| *n)
    }

    /// Value for an `Allow` header.
    #[must_use]
    pub fn allow_header(self) -> String {
        self.normalized().names().collect::<Vec<_>>().join(", ")
    }
}

impl From<&str> for MethodSet {
    fn from(s: &str) -> Self {
        s.split(',').map(str::trim).fold(Self::empty(), |acc, name| acc | Self::from_name(name))
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().collect::<Vec<_>>().join(", "))
    }
}

impl Serialize for MethodSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for MethodSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.iter().fold(Self::empty(), |acc, name| acc | Self::from_name(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_implies_head() {
        assert!(MethodSet::GET.allows("HEAD"));
        assert!(!MethodSet::POST.allows("HEAD"));
        assert_eq!(MethodSet::GET.allow_header(), "GET, HEAD");
    }

    #[test]
    fn parses_lists() {
        let set = MethodSet::from("get, Post");
        assert_eq!(set, MethodSet::GET | MethodSet::POST);
        assert!(!set.allows("BREW"));
    }

    #[test]
    fn names_are_canonical() {
        let set = MethodSet::PATCH | MethodSet::GET | MethodSet::DELETE;
        assert_eq!(set.to_string(), "GET, DELETE, PATCH");
    }
}
