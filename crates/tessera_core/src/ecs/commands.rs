//! # Deferred Structural Commands
//!
//! Structural changes (spawn, despawn, add/remove component) relocate rows
//! and would invalidate the column slices a running system holds. Systems
//! record them on a [`CommandQueue`] instead; the world applies the queue
//! after the layer pass, in recording order.
//!
//! ```rust,ignore
//! let commands = world.command_queue();
//! world.register_system(
//!     GAMEPLAY_LAYER,
//!     System::<(Health,)>::new("reap", move |_, entities, health| {
//!         for (entity, hp) in entities.iter().zip(health.iter()) {
//!             if hp.0 <= 0.0 {
//!                 commands.remove_entity(*entity);
//!             }
//!         }
//!     }),
//! )?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use super::component::Component;
use super::entity::EntityId;
use super::world::{EntityMut, World};

/// Deferred world mutation.
pub enum Command {
    /// Creates an entity without components.
    CreateEntity,
    /// Removes an entity and all of its components.
    RemoveEntity(EntityId),
    /// Arbitrary mutation, used for typed component changes.
    Apply(Box<dyn FnOnce(&mut World) + Send>),
}

impl Command {
    /// Applies the command.
    pub fn apply(self, world: &mut World) {
        match self {
            Self::CreateEntity => {
                world.create_entity();
            }
            Self::RemoveEntity(id) => world.remove_entity(id),
            Self::Apply(apply) => apply(world),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateEntity => f.write_str("CreateEntity"),
            Self::RemoveEntity(id) => f.debug_tuple("RemoveEntity").field(id).finish(),
            Self::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// Shared, cloneable recorder of [`Command`]s.
///
/// Clones record into the same queue.
#[derive(Clone, Default)]
pub struct CommandQueue {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a command.
    pub fn push_command(&self, command: Command) {
        self.commands.lock().push(command);
    }

    /// Records an arbitrary world mutation.
    pub fn push(&self, apply: impl FnOnce(&mut World) + Send + 'static) {
        self.push_command(Command::Apply(Box::new(apply)));
    }

    /// Records the creation of an empty entity.
    pub fn create_entity(&self) {
        self.push_command(Command::CreateEntity);
    }

    /// Records the creation of an entity, configured by `build`.
    pub fn create_entity_with(&self, build: impl FnOnce(&mut EntityMut<'_>) + Send + 'static) {
        self.push(move |world| {
            let mut entity = world.spawn();
            build(&mut entity);
        });
    }

    /// Records the removal of an entity.
    pub fn remove_entity(&self, id: EntityId) {
        self.push_command(Command::RemoveEntity(id));
    }

    /// Records adding a default-constructed component.
    pub fn add_component<C: Component>(&self, id: EntityId) {
        self.push(move |world| {
            world.add_component::<C>(id);
        });
    }

    /// Records adding a component with a value.
    pub fn add_component_with<C: Component>(&self, id: EntityId, value: C) {
        self.push(move |world| {
            world.add_component_with(id, value);
        });
    }

    /// Records removing a component.
    pub fn remove_component<C: Component>(&self, id: EntityId) {
        self.push(move |world| world.remove_component::<C>(id));
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// Checks if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Takes every recorded command, leaving the queue empty.
    pub(crate) fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.lock())
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue").field("len", &self.len()).finish()
    }
}
