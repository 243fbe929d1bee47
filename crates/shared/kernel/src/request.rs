use crate::error::Error;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Uri, header};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// Largest request body that is read into memory.
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Ordered multi-valued string mapping for query arguments and form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDict {
    pairs: Vec<(String, String)>,
}

impl MultiDict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` data.
    #[must_use]
    pub fn parse_urlencoded(input: &[u8]) -> Self {
        Self { pairs: url::form_urlencoded::parse(input).into_owned().collect() }
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Parses the first value for `key`.
    ///
    /// # Errors
    /// Returns [`Error::BadRequest`] when the value does not parse.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|err| Error::bad_request(format!("Invalid `{key}`: {err}")))
            })
            .transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Serializes as a map of each key to its first value.
impl Serialize for MultiDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.pairs.len());
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.pairs {
            if !seen.contains(&key.as_str()) {
                seen.push(key);
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

#[derive(Debug)]
struct RequestInner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    args: MultiDict,
    form: OnceLock<MultiDict>,
    cookies: OnceLock<Vec<(String, String)>>,
}

/// Read-only view of the HTTP request being handled. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let args = uri.query().map(|q| MultiDict::parse_urlencoded(q.as_bytes())).unwrap_or_default();
        Self {
            inner: Arc::new(RequestInner {
                method,
                uri,
                headers,
                body,
                args,
                form: OnceLock::new(),
                cookies: OnceLock::new(),
            }),
        }
    }

    /// A body-less `GET` request, for scripts and tests.
    ///
    /// # Errors
    /// Returns [`Error::BadRequest`] when `uri` is not a valid request target.
    pub fn get(uri: &str) -> Result<Self, Error> {
        let uri = uri.parse::<Uri>().map_err(|err| Error::bad_request(err.to_string()))?;
        Ok(Self::new(Method::GET, uri, HeaderMap::new(), Bytes::new()))
    }

    /// Collects the body of an incoming request.
    ///
    /// # Errors
    /// Returns [`Error::BadRequest`] when the body exceeds [`MAX_BODY_SIZE`] or cannot be read.
    pub async fn from_http(request: axum::http::Request<Body>) -> Result<Self, Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_SIZE)
            .await
            .map_err(|err| Error::bad_request(format!("Unreadable request body: {err}")))?;
        Ok(Self::new(parts.method, parts.uri, parts.headers, body))
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Header value as a string, `None` when missing or not visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Query string arguments.
    #[must_use]
    pub fn args(&self) -> &MultiDict {
        &self.inner.args
    }

    /// URL-encoded form fields, empty for any other content type.
    #[must_use]
    pub fn form(&self) -> &MultiDict {
        self.inner.form.get_or_init(|| {
            let is_form = self
                .header(header::CONTENT_TYPE.as_str())
                .and_then(|ct| ct.split(';').next())
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
            if is_form { MultiDict::parse_urlencoded(&self.inner.body) } else { MultiDict::new() }
        })
    }

    /// Cookie pairs in header order.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        self.inner.cookies.get_or_init(|| {
            self.inner
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(';'))
                .filter_map(|pair| {
                    let (name, value) = pair.split_once('=')?;
                    let name = name.trim();
                    (!name.is_empty()).then(|| (name.to_owned(), value.trim().trim_matches('"').to_owned()))
                })
                .collect()
        })
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Host the request was sent to, without the port.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        let host = self.header(header::HOST.as_str()).or_else(|| self.inner.uri.host())?;
        Some(strip_port(host))
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    /// Returns [`Error::BadRequest`] when the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.inner.body)
            .map_err(|err| Error::bad_request(format!("Invalid JSON body: {err}")))
    }
}

pub(crate) fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(v6, _)| &host[..=v6.len()]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request(method: Method, uri: &str, headers: &[(&'static str, &'static str)], body: &'static str) -> Request {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(value));
        }
        Request::new(method, uri.parse().unwrap(), map, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn query_arguments_keep_every_value() {
        let req = request(Method::GET, "/?tag=a&tag=b&page=2&json", &[], "");
        assert_eq!(req.args().get("tag"), Some("a"));
        assert_eq!(req.args().get_all("tag").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(req.args().parse::<u32>("page").unwrap(), Some(2));
        assert!(req.args().contains("json"));
        assert!(req.args().parse::<u32>("tag").is_err());
    }

    #[test]
    fn form_requires_urlencoded_content_type() {
        let form = request(
            Method::POST,
            "/",
            &[("content-type", "application/x-www-form-urlencoded; charset=utf-8")],
            "greeting=Hej+d%C3%A5",
        );
        assert_eq!(form.form().get("greeting"), Some("Hej då"));

        let json = request(Method::POST, "/", &[("content-type", "application/json")], "{}");
        assert!(json.form().is_empty());
    }

    #[test]
    fn cookies_and_host() {
        let req = request(
            Method::GET,
            "/",
            &[("cookie", "session=abc; theme=\"dark\""), ("host", "example.org:8008")],
            "",
        );
        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.host(), Some("example.org"));
        assert_eq!(strip_port("[::1]:80"), "[::1]");
    }

    #[test]
    fn multidict_serializes_first_values() {
        let dict: MultiDict = [("a", "1"), ("a", "2"), ("b", "3")].into_iter().collect();
        assert_eq!(serde_json::to_string(&dict).unwrap(), r#"{"a":"1","b":"3"}"#);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let body = Body::from(vec![b'x'; MAX_BODY_SIZE + 1]);
        let http = axum::http::Request::post("/").body(body).unwrap();
        let err = Request::from_http(http).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
