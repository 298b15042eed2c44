//! # Component Type IDs
//!
//! Maps Rust types to compact, world-local ids in first-seen order.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a component type within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Memoized counter assigning one [`ComponentTypeId`] per Rust type.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, assigning the next free one on first use.
    pub fn id_of<T: 'static>(&mut self) -> ComponentTypeId {
        let next = ComponentTypeId(u32::try_from(self.ids.len()).unwrap_or(u32::MAX));
        *self.ids.entry(TypeId::of::<T>()).or_insert(next)
    }

    /// Returns the id of `T` if it has been assigned.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Number of ids handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Checks if no id has been handed out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Transform;
    struct Graphics;

    #[test]
    fn test_ids_are_stable_and_distinct() {
        let mut types = TypeRegistry::new();
        let transform = types.id_of::<Transform>();
        let graphics = types.id_of::<Graphics>();

        assert_ne!(transform, graphics);
        assert_eq!(types.id_of::<Transform>(), transform);
        assert_eq!(types.id_of::<Graphics>(), graphics);
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn test_ids_follow_first_seen_order() {
        let mut types = TypeRegistry::new();
        assert_eq!(types.id_of::<Graphics>().raw(), 0);
        assert_eq!(types.id_of::<Transform>().raw(), 1);
    }

    #[test]
    fn test_get_does_not_assign() {
        let types = TypeRegistry::new();
        assert!(types.get::<Transform>().is_none());
        assert!(types.is_empty());
    }
}
