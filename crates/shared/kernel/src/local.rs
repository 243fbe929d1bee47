//! Request-local state and the context stack.
//!
//! Every request gets a fresh [`Local`]: values cached in it live exactly as long as the
//! request. The [`Environment`] of the request being handled is bound on a task-local stack
//! so that code without an explicit handle can still reach it through [`current`].

use crate::environment::Environment;
use crate::error::Error;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

/// Type-keyed storage scoped to one request.
#[derive(Default)]
pub struct Local {
    slots: Mutex<FxHashMap<TypeId, Slot>>,
}

impl fmt::Debug for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Local").field("len", &self.len()).finish()
    }
}

impl Local {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(&TypeId::of::<T>()).cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Stores `value`, returning the value it replaced.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.insert_arc(Arc::new(value))
    }

    pub fn insert_arc<T: Any + Send + Sync>(&self, value: Arc<T>) -> Option<Arc<T>> {
        let previous = self.slots.lock().insert(TypeId::of::<T>(), value)?;
        previous.downcast::<T>().ok()
    }

    /// Returns the cached value, computing it on first access.
    ///
    /// `init` runs without the lock held, so it may itself use this `Local`. When two callers
    /// race, the first stored value wins and both observe it.
    pub fn get_or_init<T, F>(&self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get::<T>() {
            return value;
        }
        self.store_first(Arc::new(init()))
    }

    /// Fallible [`Local::get_or_init`]. Nothing is cached when `init` fails.
    ///
    /// # Errors
    /// Returns the error of `init`.
    pub fn get_or_try_init<T, E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get::<T>() {
            return Ok(value);
        }
        Ok(self.store_first(Arc::new(init()?)))
    }

    fn store_first<T: Any + Send + Sync>(&self, value: Arc<T>) -> Arc<T> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(TypeId::of::<T>()).or_insert(value))
        };
        // The slot was keyed by `T`'s id, so the downcast cannot fail.
        match slot.downcast::<T>() {
            Ok(value) => value,
            Err(_) => unreachable!("local slot holds a value of another type"),
        }
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self.slots.lock().remove(&TypeId::of::<T>())?;
        slot.downcast::<T>().ok()
    }

    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.slots.lock().contains_key(&TypeId::of::<T>())
    }

    /// Drops every value.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

tokio::task_local! {
    static STACK: Vec<Environment>;
}

/// Runs `future` with `env` on top of the context stack.
///
/// The binding ends when the future completes or is dropped. Binds nest; tasks spawned from
/// inside do not inherit the stack.
pub async fn bind<F: Future>(env: Environment, future: F) -> F::Output {
    let mut stack = STACK.try_with(Clone::clone).unwrap_or_default();
    stack.push(env);
    STACK.scope(stack, future).await
}

/// The environment on top of the context stack.
///
/// # Errors
/// Returns [`Error::Unbound`] outside of a bound request.
pub fn current() -> Result<Environment, Error> {
    STACK
        .try_with(|stack| stack.last().cloned())
        .ok()
        .flatten()
        .ok_or(Error::Unbound { context: None })
}

/// Number of environments bound on the current task.
#[must_use]
pub fn depth() -> usize {
    STACK.try_with(Vec::len).unwrap_or(0)
}
