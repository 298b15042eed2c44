//! # Entity Directory
//!
//! The single source of truth for where an entity's data lives.

use std::collections::HashMap;

use super::archetype::ArchetypeIndex;
use super::entity::EntityId;

/// Location of a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Archetype holding the entity's components.
    pub archetype: ArchetypeIndex,
    /// Row within that archetype.
    pub row: usize,
    /// Whether the entity is active. Collaborators decide what that means.
    pub enabled: bool,
}

impl Record {
    /// An enabled entity at `row` of `archetype`.
    #[must_use]
    pub const fn new(archetype: ArchetypeIndex, row: usize) -> Self {
        Self {
            archetype,
            row,
            enabled: true,
        }
    }
}

/// Maps every live entity to its [`Record`].
#[derive(Debug, Default)]
pub struct EntityDirectory {
    records: HashMap<EntityId, Record>,
}

impl EntityDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an entity.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Record> {
        self.records.get(&id).copied()
    }

    /// Mutable lookup.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    /// Inserts or replaces a record.
    #[inline]
    pub fn insert(&mut self, id: EntityId, record: Record) {
        self.records.insert(id, record);
    }

    /// Moves an entity to a new location, keeping its enabled flag.
    #[inline]
    pub fn relocate(&mut self, id: EntityId, archetype: ArchetypeIndex, row: usize) {
        if let Some(record) = self.records.get_mut(&id) {
            record.archetype = archetype;
            record.row = row;
        }
    }

    /// Removes an entity.
    #[inline]
    pub fn remove(&mut self, id: EntityId) -> Option<Record> {
        self.records.remove(&id)
    }

    /// Checks if an entity is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forgets every entity.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// All live ids, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterates over all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, Record)> + '_ {
        self.records.iter().map(|(&id, &record)| (id, record))
    }
}
