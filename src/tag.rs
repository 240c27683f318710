use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;

/// An interned identifier for a component or system type.
///
/// Tags are allocated from a process-global registry the first time a type
/// is seen and are stable for the lifetime of the process. They carry the
/// [`type_name`] of the tagged type for diagnostics.
#[derive(Clone, Copy)]
pub(crate) struct TypeTag {
    id: usize,
    name: &'static str,
}

impl TypeTag {
    /// Returns the tag of the given type.
    pub fn of<T: 'static>() -> Self {
        static REGISTRY: OnceLock<DashMap<TypeId, TypeTag>> = OnceLock::new();
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        *REGISTRY
            .get_or_init(Default::default)
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Self {
                id: COUNTER.fetch_add(1, Ordering::Relaxed),
                name: type_name::<T>(),
            })
    }

    /// The [`std::any::type_name`] of the tagged type.
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTag")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn tags_are_unique_per_type() {
        assert_ne!(TypeTag::of::<A>(), TypeTag::of::<B>());
        assert_eq!(TypeTag::of::<A>(), TypeTag::of::<A>());
    }

    #[test]
    fn tags_carry_the_type_name() {
        assert!(TypeTag::of::<A>().type_name().ends_with("A"));
        assert!(TypeTag::of::<B>().type_name().ends_with("B"));
    }
}
