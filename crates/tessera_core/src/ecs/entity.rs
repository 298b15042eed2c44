//! # Entity Management
//!
//! Entities are plain identifiers handed out by a single monotonic counter.
//! An id is never reused unless the counter is explicitly reset.

use std::fmt;

/// Unique identifier for an entity.
///
/// The value `0` is [`EntityId::NULL`] and never denotes a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic entity id counter.
#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    /// Last id handed out (0 before the first allocation).
    counter: u32,
}

impl EntityIdAllocator {
    /// Creates a counter whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Hands out the next id.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit id space is exhausted.
    #[inline]
    pub fn next_id(&mut self) -> EntityId {
        self.counter = self
            .counter
            .checked_add(1)
            .unwrap_or_else(|| panic!("entity id space exhausted"));
        EntityId(self.counter)
    }

    /// Resets the counter so the next id is `counter + 1`.
    #[inline]
    pub fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    /// Returns the last id handed out.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.counter
    }
}
