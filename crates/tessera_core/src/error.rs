//! # ECS Error Types
//!
//! All errors that can occur in the ECS core.
//!
//! The plain world operations (`add_component`, `get_component`, ...)
//! never surface these: they log and degrade to a no-op or `None`. The
//! `try_` forms return them so callers can act on the reason.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component type was registered twice.
    #[error("component already registered: {name}")]
    DuplicateComponent {
        /// Name given at the first registration.
        name: String,
    },

    /// A component type was used before `register_component`.
    #[error("component type not registered: {type_name}")]
    UnregisteredComponent {
        /// Rust type name of the component.
        type_name: &'static str,
    },

    /// The null entity id was passed where a live entity was expected.
    #[error("the null entity cannot be registered or modified")]
    NullEntity,

    /// The entity is not registered in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity id is already registered.
    #[error("entity already exists: {0}")]
    EntityAlreadyExists(EntityId),

    /// The entity already carries the component.
    #[error("entity {entity} already has component {component}")]
    ComponentAlreadyPresent {
        /// Target entity.
        entity: EntityId,
        /// Registered component name.
        component: String,
    },

    /// The entity does not carry the component.
    #[error("entity {entity} has no component {component}")]
    ComponentMissing {
        /// Target entity.
        entity: EntityId,
        /// Registered component name.
        component: String,
    },

    /// A system declared the same component type more than once.
    #[error("system {system} declares a component type more than once")]
    DuplicateSystemComponent {
        /// System name.
        system: String,
    },

    /// A structural change was requested while systems were running.
    #[error("structural change requested during system dispatch")]
    DispatchInProgress,

    /// Directory and archetype storage disagree.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
