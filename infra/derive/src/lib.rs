#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Ramverk crates.
//!
//! * [`ramverk_error`] wires an error enum into `thiserror` and the context helpers.
//! * [`extension`] turns a plain struct into a cheaply cloneable application extension.
//!
//! Examples are `ignore`d because a proc-macro crate cannot use its own macros in doctests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// Defines a crate error enum.
///
/// # Features
///
/// * **Automatic Derives**: injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to results of every wrapped source error.
/// * **Standard Conversions**: implements `From<T>` for variants carrying a `source` field
///   (or a field marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Internal Fallback**: implements `From<&'static str>` and `From<String>` when an
///   `Internal { message, context }` variant exists.
/// * **Formatting**: emits a private `format_context` helper for `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields. Tuple and unit variants are rejected.
/// 3. A variant wrapping a source error must carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use ramverk_derive::ramverk_error;
/// use std::borrow::Cow;
///
/// #[ramverk_error]
/// pub enum StorageError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &std::path::Path) -> Result<Vec<u8>, StorageError> {
///     std::fs::read(path).context("Reading record")
/// }
/// ```
#[proc_macro_attribute]
pub fn ramverk_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Turns a struct into an application extension handle.
///
/// 1. Moves the fields into a generated `<Name>Inner` struct.
/// 2. Wraps it in an `Arc` with `Deref` to the inner state.
/// 3. Implements `ramverk_kernel::domain::registry::Extension` so the handle can be
///    installed with `ApplicationBuilder::extension` and extracted with `Ext<Name>`.
///
/// # Example
/// ```rust,ignore
/// #[ramverk_derive::extension]
/// pub struct Greeting {
///     pub text: String,
/// }
///
/// let greeting = Greeting::new(GreetingInner { text: "Hello".to_owned() });
/// ```
#[proc_macro_attribute]
pub fn extension(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::extension::expand(input).into()
}
