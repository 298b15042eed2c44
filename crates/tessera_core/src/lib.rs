//! # TESSERA Core Engine
//!
//! Archetype Entity Component System (ECS) for the TESSERA engine:
//! - Type-erased, columnar component storage
//! - Entity lifecycle with a single location directory
//! - Layered system scheduling with deferred structural commands
//!
//! ## Architecture Rules
//!
//! 1. **Components are pure data** - behavior lives in systems
//! 2. **Data-oriented design** - one contiguous column per component type
//! 3. **Explicit ownership** - every registry belongs to a [`World`]; there
//!    is no global state
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{System, World};
//!
//! let mut world = World::new();
//! world.register_component::<Position>("Position");
//! world.register_component::<Velocity>("Velocity");
//!
//! let entity = world
//!     .spawn()
//!     .with(Position { x: 0.0 })
//!     .with(Velocity { x: 1.0 })
//!     .id();
//!
//! world.register_system(
//!     0,
//!     System::<(Position, Velocity)>::new("movement", |dt, _, positions, velocities| {
//!         for (p, v) in positions.iter_mut().zip(velocities.iter()) {
//!             p.x += v.x * dt;
//!         }
//!     }),
//! )?;
//! world.run_systems(0, 0.5);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::EcsConfig;
pub use ecs::{
    Archetype, ArchetypeSignature, Command, CommandQueue, Component, ComponentSet,
    ComponentTypeId, EntityId, EntityMut, MatchMode, System, World,
};
pub use error::{EcsError, EcsResult};
