use crate::error::Error;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use serde::Serialize;
use std::borrow::Cow;

pub const DEFAULT_MIMETYPE: &str = "text/html";
pub const DEFAULT_CHARSET: &str = "utf-8";
pub const JSON_MIMETYPE: &str = "application/json";

/// Appends the charset to textual mimetypes: `text/css` gives `text/css; charset=utf-8`.
#[must_use]
pub fn content_type(mimetype: &str) -> String {
    let textual = mimetype.starts_with("text/")
        || mimetype.ends_with("+xml")
        || matches!(
            mimetype,
            "application/xml"
                | "application/xml-dtd"
                | "application/javascript"
                | "application/ecmascript"
        );
    if textual && !mimetype.contains("charset=") {
        format!("{mimetype}; charset={DEFAULT_CHARSET}")
    } else {
        mimetype.to_owned()
    }
}

/// Fully buffered HTTP response.
///
/// Built with a fluent API so endpoints can adjust a rendered response:
///
/// ```rust
/// use ramverk_kernel::Response;
/// use axum::http::StatusCode;
///
/// let response = Response::new("body { color: red }")
///     .with_mimetype("text/css")
///     .with_status(StatusCode::CREATED);
/// assert_eq!(response.content_type(), Some("text/css; charset=utf-8"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Bytes::new())
    }
}

impl Response {
    /// A `200 OK` HTML response.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: body.into() }
            .with_mimetype(DEFAULT_MIMETYPE)
    }

    /// Serializes `value` as an `application/json` response.
    ///
    /// # Errors
    /// Returns [`Error::Json`] when `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(body).with_mimetype(JSON_MIMETYPE))
    }

    /// A `302 Found` redirect to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let escaped = escape(location);
        let body = format!(
            "<!doctype html>\n<html lang=en>\n<title>Redirecting...</title>\n<h1>Redirecting...</h1>\n\
             <p>You should be redirected automatically to the target URL: \
             <a href=\"{escaped}\">{escaped}</a>. If not, click the link.\n"
        );
        let mut response = Self::new(body).with_status(StatusCode::FOUND);
        match HeaderValue::try_from(location) {
            Ok(value) => {
                response.headers.insert(header::LOCATION, value);
            },
            Err(_) => {
                let encoded = urlencoding::encode(location).into_owned();
                if let Ok(value) = HeaderValue::try_from(encoded) {
                    response.headers.insert(header::LOCATION, value);
                }
            },
        }
        response
    }

    /// The default error page for `err`.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        let status = err.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        let body = format!(
            "<!doctype html>\n<html lang=en>\n<title>{code} {reason}</title>\n<h1>{reason}</h1>\n<p>{}</p>\n",
            escape(&err.description()),
            code = status.as_u16(),
        );
        let mut response = Self::new(body).with_status(status);
        if let Error::MethodNotAllowed { allowed, .. } = err
            && let Ok(value) = HeaderValue::try_from(allowed.allow_header())
        {
            response.headers.insert(header::ALLOW, value);
        }
        response
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the mimetype, appending the charset where it applies.
    #[must_use]
    pub fn with_mimetype(self, mimetype: &str) -> Self {
        let value = content_type(mimetype);
        self.with_content_type(&value)
    }

    /// Sets the `Content-Type` header verbatim. Invalid values are ignored.
    #[must_use]
    pub fn with_content_type(mut self, value: &str) -> Self {
        if let Ok(value) = HeaderValue::try_from(value) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self
    }

    /// Replaces a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces every header present in `headers`.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let mut last = None;
        for (name, value) in headers {
            let name = match name {
                Some(name) => {
                    self.headers.remove(&name);
                    last = Some(name.clone());
                    name
                },
                None => match &last {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            self.headers.append(name, value);
        }
        self
    }

    /// Parses and sets a header.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when the name or value is not a valid header.
    pub fn try_with_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::try_from(name).map_err(Error::internal)?;
        let value = HeaderValue::try_from(value).map_err(Error::internal)?;
        Ok(self.with_header(name, value))
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header without replacing existing values, for example `Set-Cookie`.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The mimetype without parameters.
    #[must_use]
    pub fn mimetype(&self) -> Option<&str> {
        self.content_type().and_then(|ct| ct.split(';').next()).map(str::trim)
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::methods::MethodSet;

    #[test]
    fn charset_applies_to_textual_types() {
        assert_eq!(content_type("text/html"), "text/html; charset=utf-8");
        assert_eq!(content_type("image/svg+xml"), "image/svg+xml; charset=utf-8");
        assert_eq!(content_type("application/json"), "application/json");
        assert_eq!(content_type("image/png"), "image/png");
    }

    #[test]
    fn json_responses() {
        let response = Response::json(&serde_json::json!({"greeting": "Hello"})).unwrap();
        assert_eq!(response.mimetype(), Some("application/json"));
        assert_eq!(response.text(), r#"{"greeting":"Hello"}"#);
    }

    #[test]
    fn redirects_carry_location() {
        let response = Response::redirect("/?a=1&b=2");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/?a=1&b=2");
        assert!(response.text().contains("href=\"/?a=1&amp;b=2\""));
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let err = Error::method_not_allowed("PUT", MethodSet::GET | MethodSet::POST);
        let response = Response::from_error(&err);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, POST");
        assert!(response.text().contains("<title>405 Method Not Allowed</title>"));
    }

    #[test]
    fn header_overrides() {
        let mut extra = HeaderMap::new();
        extra.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        let mut response = Response::new("x")
            .with_status(StatusCode::ACCEPTED)
            .with_headers(extra)
            .try_with_header("x-frame-options", "DENY")
            .unwrap();
        response.append_header(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        response.append_header(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(Response::new("x").try_with_header("bad header", "v").is_err());
    }
}
