//! # Entity Component System
//!
//! An archetype ECS: entities sharing a component set are stored together,
//! one contiguous column per component type.
//!
//! ## Design Philosophy
//!
//! - Component data lives only in type-erased archetype columns
//! - A single directory maps every entity to its archetype and row
//! - Systems match an exact component set and receive whole columns
//! - Structural changes from inside systems go through a [`CommandQueue`]

mod archetype;
mod commands;
mod component;
mod directory;
mod entity;
mod system;
mod type_registry;
mod world;

pub use archetype::{Archetype, ArchetypeIndex, ArchetypeSignature};
pub use commands::{Command, CommandQueue};
pub use component::{Component, ComponentDescriptor, ComponentOps, ComponentRegistry};
pub use directory::{EntityDirectory, Record};
pub use entity::{EntityId, EntityIdAllocator};
pub use system::{ComponentSet, MatchMode, Scheduler, System};
pub use type_registry::{ComponentTypeId, TypeRegistry};
pub use world::{EntityMut, World};
