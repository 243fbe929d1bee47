use std::borrow::Cow;

#[ramverk_derive::ramverk_error]
pub enum TemplatingError {
    #[error("Template error{}: {source}", format_context(.context))]
    Template { source: minijinja::Error, context: Option<Cow<'static, str>> },

    #[error("Internal templating error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<TemplatingError> for ramverk_kernel::Error {
    fn from(err: TemplatingError) -> Self {
        Self::render(err.to_string())
    }
}
