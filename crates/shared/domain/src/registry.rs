//! Extension registry for application-wide state.
//! A minimal type-erased container for the values components and applications install.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;

/// Marker trait for application state that can be shared across threads.
pub trait Extension: Any + Debug + Send + Sync {
    /// Helper to allow downcasting from the trait object.
    fn as_any(&self) -> &dyn Any;
}

/// A container for an initialized extension.
#[derive(Debug)]
pub struct InitializedExtension {
    pub id: TypeId,
    pub state: Box<dyn Extension>,
}

impl InitializedExtension {
    /// Create a new initialized extension from a concrete state.
    pub fn new<T: Extension>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), state: Box::new(state) }
    }
}

/// Extensions keyed by their concrete type.
#[derive(Debug, Default)]
pub struct Extensions {
    entries: HashMap<TypeId, Box<dyn Extension>>,
}

impl Extensions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an extension, returning `false` when one of that type already existed.
    pub fn insert(&mut self, ext: InitializedExtension) -> bool {
        self.entries.insert(ext.id, ext.state).is_none()
    }

    #[must_use]
    pub fn get<T: Extension>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>()).and_then(|ext| ext.as_any().downcast_ref::<T>())
    }

    #[must_use]
    pub fn contains<T: Extension>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    impl Extension for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn stores_by_type() {
        let mut exts = Extensions::new();
        assert!(exts.insert(InitializedExtension::new(Counter(1))));
        assert!(!exts.insert(InitializedExtension::new(Counter(2))));
        assert_eq!(exts.get::<Counter>(), Some(&Counter(2)));
        assert_eq!(exts.len(), 1);
    }
}
