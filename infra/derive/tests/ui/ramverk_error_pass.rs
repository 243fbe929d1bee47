use ramverk_derive::ramverk_error;
use std::borrow::Cow;

#[ramverk_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Not found{}: {what}", format_context(.context))]
    NotFound { what: String, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<Vec<u8>, DemoError> {
    std::fs::read("/definitely/not/here").context("Reading fixture")
}

fn main() {
    let err = read().unwrap_err();
    assert!(err.to_string().starts_with("IO error (Reading fixture)"));

    let internal: DemoError = "boom".into();
    assert_eq!(internal.to_string(), "Internal error: boom");

    let missing: Result<(), DemoError> =
        Err(DemoError::NotFound { what: "page".to_owned(), context: None });
    let missing = missing.context("Loading page").unwrap_err();
    assert_eq!(missing.to_string(), "Not found (Loading page): page");
}
