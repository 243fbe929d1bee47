//! Arguments injected into handlers.

use crate::application::Application;
use crate::domain::config::Settings;
use crate::domain::registry::Extension;
use crate::environment::Environment;
use crate::error::Error;
use crate::log::Channel;
use crate::request::{MultiDict, Request};
use crate::routing::Segments;
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// A value a handler can take as an argument, produced from the request environment.
///
/// Arguments are extracted in declaration order; the first failure answers the request.
pub trait FromEnvironment: Sized + Send + 'static {
    /// # Errors
    /// Any error stops the handler from running and becomes the response.
    fn from_environment(env: &Environment) -> Result<Self, Error>;
}

impl FromEnvironment for Environment {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.clone())
    }
}

impl FromEnvironment for Application {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.application().clone())
    }
}

impl FromEnvironment for Request {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.request().clone())
    }
}

impl FromEnvironment for Segments {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.segments().clone())
    }
}

impl FromEnvironment for Settings {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.settings().clone())
    }
}

impl FromEnvironment for Channel {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(env.log().clone())
    }
}

/// `None` instead of an error.
impl<T: FromEnvironment> FromEnvironment for Option<T> {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(T::from_environment(env).ok())
    }
}

/// Lets the handler decide what to do with the error.
impl<T: FromEnvironment> FromEnvironment for Result<T, Error> {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(T::from_environment(env))
    }
}

/// An application extension.
#[derive(Debug, Clone)]
pub struct Ext<T>(pub T);

impl<T> Deref for Ext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Extension + Clone> FromEnvironment for Ext<T> {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        env.application().extension::<T>().cloned().map(Ext).ok_or_else(|| {
            Error::from(format!("Extension `{}` is not installed", std::any::type_name::<T>()))
        })
    }
}

/// Query string arguments.
#[derive(Debug, Clone)]
pub struct Args(pub MultiDict);

impl Deref for Args {
    type Target = MultiDict;

    fn deref(&self) -> &MultiDict {
        &self.0
    }
}

impl FromEnvironment for Args {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(Self(env.request().args().clone()))
    }
}

/// URL-encoded form fields.
#[derive(Debug, Clone)]
pub struct Form(pub MultiDict);

impl Deref for Form {
    type Target = MultiDict;

    fn deref(&self) -> &MultiDict {
        &self.0
    }
}

impl FromEnvironment for Form {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        Ok(Self(env.request().form().clone()))
    }
}

/// JSON request body.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned + Send + 'static> FromEnvironment for Json<T> {
    fn from_environment(env: &Environment) -> Result<Self, Error> {
        env.request().json().map(Json)
    }
}
