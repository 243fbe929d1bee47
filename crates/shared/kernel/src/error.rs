use crate::domain::methods::MethodSet;
use axum::http::StatusCode;
use std::borrow::Cow;

/// Errors raised while building an application or handling a request.
///
/// `NotFound`, `MethodNotAllowed` and `BadRequest` are HTTP errors: they are turned into an
/// error page and the request still completes. Everything else answers `500` and fails the
/// request.
#[ramverk_derive::ramverk_error]
pub enum Error {
    #[error("Not found{}: {path}", format_context(.context))]
    NotFound { path: String, context: Option<Cow<'static, str>> },

    #[error("Method {method} not allowed{}, expected one of {allowed}", format_context(.context))]
    MethodNotAllowed { method: String, allowed: MethodSet, context: Option<Cow<'static, str>> },

    #[error("Bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No rule could be filled for the endpoint.
    #[error("Could not build URL{}: {message}", format_context(.context))]
    Build { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid rule{}: {message}", format_context(.context))]
    Routing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Render error{}: {message}", format_context(.context))]
    Render { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("JSON error{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// Request-bound state was used with no environment on the context stack.
    #[error("No environment bound to this task{}", format_context(.context))]
    Unbound { context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl Error {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into(), context: None }
    }

    pub fn method_not_allowed(method: impl Into<String>, allowed: MethodSet) -> Self {
        Self::MethodNotAllowed { method: method.into(), allowed, context: None }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }

    pub fn build(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Build { message: message.into(), context: None }
    }

    pub fn routing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Routing { message: message.into(), context: None }
    }

    pub fn render(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Render { message: message.into(), context: None }
    }

    /// Wraps any displayable failure as an internal error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal { message: Cow::Owned(err.to_string()), context: None }
    }

    /// Whether this error describes the client's request rather than a server failure.
    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::MethodNotAllowed { .. } | Self::BadRequest { .. })
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human readable description for the error page. Internal details are not exposed.
    #[must_use]
    pub fn description(&self) -> Cow<'static, str> {
        match self {
            Self::NotFound { .. } => Cow::Borrowed(
                "The requested URL was not found on the server. If you entered the URL \
                 manually please check your spelling and try again.",
            ),
            Self::MethodNotAllowed { .. } => {
                Cow::Borrowed("The method is not allowed for the requested URL.")
            },
            Self::BadRequest { message, .. } => Cow::Owned(message.to_string()),
            _ => Cow::Borrowed(
                "The server encountered an internal error and was unable to complete your \
                 request.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_map_to_client_statuses() {
        assert_eq!(Error::not_found("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::method_not_allowed("PUT", MethodSet::GET).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert!(Error::bad_request("nope").is_http());
        assert!(!Error::build("x").is_http());
        assert_eq!(Error::from("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn context_is_rendered() {
        let err: Result<(), Error> = Err(Error::not_found("/missing"));
        let err = err.context("Dispatching").unwrap_err();
        assert_eq!(err.to_string(), "Not found (Dispatching): /missing");
    }

    #[test]
    fn internal_details_stay_private() {
        let err = Error::internal("secret table missing");
        assert!(!err.description().contains("secret"));
    }
}
