//! # ECS World
//!
//! The central container for all entities, components and systems.
//!
//! ## Memory Layout
//!
//! ```text
//! archetypes[0]  {}                    entities: [E1, E7]
//! archetypes[1]  {Transform}           entities: [E3]
//! archetypes[2]  {Transform, Graphics} entities: [E2, E5, E4]
//!
//! directory: E4 -> (archetype 2, row 2)
//! ```
//!
//! Adding or removing a component moves the entity's row to the archetype
//! of the new component set. The archetype at index 0 has the empty
//! signature and exists from creation; every new entity starts there.
//! Archetypes are never freed before the world is dropped.
//!
//! ## Error Handling
//!
//! The plain operations log invalid requests with `tracing` and degrade to
//! a no-op or `None`. Each has a `try_` form returning [`EcsResult`].

use std::any::type_name;
use std::collections::HashMap;

use bytemuck::Pod;

use super::archetype::{Archetype, ArchetypeIndex, ArchetypeSignature, Column};
use super::commands::CommandQueue;
use super::component::{Component, ComponentDescriptor, ComponentOps, ComponentRegistry};
use super::directory::{EntityDirectory, Record};
use super::entity::{EntityId, EntityIdAllocator};
use super::system::{dispatch, ComponentSet, Scheduler, System};
use super::type_registry::{ComponentTypeId, TypeRegistry};
use crate::config::EcsConfig;
use crate::error::{EcsError, EcsResult};

/// The ECS World - container for all game state.
///
/// Independent worlds may coexist; nothing is shared between them.
/// Dropping the world destroys every remaining component through its
/// registered operations.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// world.register_component::<Position>("Position");
/// world.register_component::<Velocity>("Velocity");
///
/// let entity = world.create_entity();
/// world.add_component_with(entity, Position { x: 0.0 });
/// world.add_component_with(entity, Velocity { x: 1.0 });
///
/// world.register_system(
///     0,
///     System::<(Position, Velocity)>::new("movement", |dt, _, positions, velocities| {
///         for (p, v) in positions.iter_mut().zip(velocities.iter()) {
///             p.x += v.x * dt;
///         }
///     }),
/// )?;
/// world.run_systems(0, 0.5);
/// ```
pub struct World {
    /// Rust type to component type id, for this world only.
    types: TypeRegistry,
    /// Descriptors of registered components.
    components: ComponentRegistry,
    /// Archetype table, creation order. Index 0 is the empty archetype.
    archetypes: Vec<Archetype>,
    /// Signature to position in `archetypes`.
    archetype_lookup: HashMap<ArchetypeSignature, ArchetypeIndex>,
    /// Where every live entity is stored.
    directory: EntityDirectory,
    /// Source of new entity ids.
    ids: EntityIdAllocator,
    /// Registered systems by layer.
    scheduler: Scheduler,
    /// Deferred structural changes.
    commands: CommandQueue,
    config: EcsConfig,
    /// Set while `run_systems` is iterating.
    dispatching: bool,
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EcsConfig::default())
    }

    /// Creates a world with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EcsConfig) -> Self {
        let empty = Archetype::new(
            ArchetypeSignature::empty(),
            std::iter::empty::<(ComponentTypeId, ComponentOps)>(),
            config.initial_column_capacity,
        );
        let mut archetype_lookup = HashMap::new();
        archetype_lookup.insert(ArchetypeSignature::empty(), ArchetypeIndex::EMPTY);

        Self {
            types: TypeRegistry::new(),
            components: ComponentRegistry::new(),
            archetypes: vec![empty],
            archetype_lookup,
            directory: EntityDirectory::new(),
            ids: EntityIdAllocator::new(),
            scheduler: Scheduler::new(),
            commands: CommandQueue::new(),
            config,
            dispatching: false,
        }
    }

    /// Returns the configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // =========================================================================
    // Component registration
    // =========================================================================

    /// Registers a component type under a display name.
    ///
    /// Registering the same type again is logged and ignored; the first
    /// name and type id are kept. Returns the type id either way.
    pub fn register_component<C: Component>(&mut self, name: &str) -> ComponentTypeId {
        match self.try_register_component::<C>(name) {
            Ok(type_id) => type_id,
            Err(err) => {
                tracing::warn!("Ignoring registration of {}: {}", name, err);
                self.types.id_of::<C>()
            }
        }
    }

    /// Registers a component type under a display name.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if `C` is already registered.
    pub fn try_register_component<C: Component>(&mut self, name: &str) -> EcsResult<ComponentTypeId> {
        let type_id = self.types.id_of::<C>();
        if let Some(existing) = self.components.get(type_id) {
            return Err(EcsError::DuplicateComponent {
                name: existing.name().to_string(),
            });
        }

        self.components.insert(ComponentDescriptor::new::<C>(name, type_id));
        tracing::debug!("Registered component {} as type {}", name, type_id);
        Ok(type_id)
    }

    /// Type id of a registered component.
    #[must_use]
    pub fn component_type_id<C: Component>(&self) -> Option<ComponentTypeId> {
        self.types
            .get::<C>()
            .filter(|&type_id| self.components.contains(type_id))
    }

    /// Descriptor of a registered component.
    #[must_use]
    pub fn component_descriptor<C: Component>(&self) -> Option<&ComponentDescriptor> {
        self.components.get(self.component_type_id::<C>()?)
    }

    /// Names of all registered components, registration order.
    #[must_use]
    pub fn registered_component_names(&self) -> Vec<&str> {
        self.components.iter().map(ComponentDescriptor::name).collect()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    fn registered_id<C: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.component_type_id::<C>()
            .ok_or(EcsError::UnregisteredComponent {
                type_name: type_name::<C>(),
            })
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Reserves a fresh entity id without registering it.
    pub fn get_new_id(&mut self) -> EntityId {
        self.ids.next_id()
    }

    /// Makes the id counter continue after `counter`.
    ///
    /// [`World::create_entity`] skips ids that are already live, so lowering
    /// the counter never hands out a duplicate.
    pub fn set_id_counter(&mut self, counter: u32) {
        self.ids.set_counter(counter);
    }

    /// Registers an entity id in the empty archetype.
    ///
    /// Returns `false` (and logs) for the null id or an id already live.
    pub fn register_entity(&mut self, id: EntityId) -> bool {
        recovered(self.try_register_entity(id), "register_entity").is_some()
    }

    /// Registers an entity id in the empty archetype.
    ///
    /// # Errors
    ///
    /// [`EcsError::NullEntity`], [`EcsError::EntityAlreadyExists`] or
    /// [`EcsError::DispatchInProgress`].
    pub fn try_register_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.ensure_idle()?;
        if id.is_null() {
            return Err(EcsError::NullEntity);
        }
        if self.directory.contains(id) {
            return Err(EcsError::EntityAlreadyExists(id));
        }

        let row = self.archetypes[ArchetypeIndex::EMPTY.0].push_default_row(id);
        self.directory.insert(id, Record::new(ArchetypeIndex::EMPTY, row));
        self.after_mutation();
        Ok(())
    }

    /// Creates an entity without components.
    ///
    /// Returns [`EntityId::NULL`] if called during dispatch.
    pub fn create_entity(&mut self) -> EntityId {
        recovered(self.try_create_entity(), "create_entity").unwrap_or(EntityId::NULL)
    }

    /// Creates an entity without components.
    ///
    /// # Errors
    ///
    /// [`EcsError::DispatchInProgress`].
    pub fn try_create_entity(&mut self) -> EcsResult<EntityId> {
        self.ensure_idle()?;
        let mut id = self.get_new_id();
        while self.directory.contains(id) {
            id = self.get_new_id();
        }
        self.try_register_entity(id)?;
        Ok(id)
    }

    /// Creates an entity and returns a handle for adding components.
    pub fn spawn(&mut self) -> EntityMut<'_> {
        let id = self.create_entity();
        debug_assert!(!id.is_null(), "spawn called during system dispatch");
        EntityMut { world: self, id }
    }

    /// Handle to a live entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        if !self.directory.contains(id) {
            return None;
        }
        Some(EntityMut { world: self, id })
    }

    /// Removes an entity and destroys all its components. The id is not
    /// handed out again.
    pub fn remove_entity(&mut self, id: EntityId) {
        recovered(self.try_remove_entity(id), "remove_entity");
    }

    /// Removes an entity and destroys all its components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::DispatchInProgress`].
    pub fn try_remove_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.ensure_idle()?;
        let record = self.record(id)?;

        let relocated = self.archetypes[record.archetype.0].remove_row(record.row);
        if let Some(relocated) = relocated {
            self.directory.relocate(relocated, record.archetype, record.row);
        }
        self.directory.remove(id);

        tracing::trace!("Removed entity {}", id);
        self.after_mutation();
        Ok(())
    }

    /// Destroys every entity. Archetypes, registrations, systems and the id
    /// counter are kept.
    pub fn remove_all_entities(&mut self) {
        recovered(self.try_remove_all_entities(), "remove_all_entities");
    }

    /// Destroys every entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::DispatchInProgress`].
    pub fn try_remove_all_entities(&mut self) -> EcsResult<()> {
        self.ensure_idle()?;
        for archetype in &mut self.archetypes {
            archetype.clear();
        }
        self.directory.clear();
        tracing::debug!("Removed all entities");
        Ok(())
    }

    /// Checks if an entity is live.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.directory.contains(id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.directory.len()
    }

    /// All live entity ids, ascending.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.directory.ids()
    }

    /// Whether an entity is enabled. `None` for unknown entities.
    #[must_use]
    pub fn is_entity_enabled(&self, id: EntityId) -> Option<bool> {
        self.directory.get(id).map(|record| record.enabled)
    }

    /// Sets the enabled flag. Returns `false` for unknown entities.
    ///
    /// Systems still see disabled entities; the flag is for callers.
    pub fn set_entity_enabled(&mut self, id: EntityId, enabled: bool) -> bool {
        match self.directory.get_mut(id) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn record(&self, id: EntityId) -> EcsResult<Record> {
        if id.is_null() {
            return Err(EcsError::NullEntity);
        }
        self.directory.get(id).ok_or(EcsError::EntityNotFound(id))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Adds a default-constructed component and returns it.
    ///
    /// `None` (logged) if the entity is unknown, `C` is unregistered or the
    /// entity already has `C`.
    pub fn add_component<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        recovered(self.try_add_component::<C>(id), "add_component")
    }

    /// Adds a default-constructed component.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], [`EcsError::UnregisteredComponent`],
    /// [`EcsError::ComponentAlreadyPresent`] or
    /// [`EcsError::DispatchInProgress`].
    pub fn try_add_component<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        self.insert_component::<C>(id, None)
    }

    /// Adds a component with a value and returns it.
    pub fn add_component_with<C: Component>(&mut self, id: EntityId, value: C) -> Option<&mut C> {
        recovered(self.try_add_component_with(id, value), "add_component_with")
    }

    /// Adds a component with a value.
    ///
    /// # Errors
    ///
    /// Same as [`World::try_add_component`].
    pub fn try_add_component_with<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<&mut C> {
        self.insert_component(id, Some(value))
    }

    fn insert_component<C: Component>(&mut self, id: EntityId, value: Option<C>) -> EcsResult<&mut C> {
        self.ensure_idle()?;
        let type_id = self.registered_id::<C>()?;
        let record = self.record(id)?;

        let signature = self.archetypes[record.archetype.0].signature();
        if signature.contains(type_id) {
            return Err(EcsError::ComponentAlreadyPresent {
                entity: id,
                component: self.components.name_of(type_id).to_string(),
            });
        }
        let target_signature = signature.with(type_id);
        let target = self.find_or_create_archetype(target_signature);

        let mut value = value;
        let row = self.migrate(id, record, target, |column| column.fill_with(&mut value));
        self.after_mutation();

        self.archetypes[target.0]
            .get_mut::<C>(type_id, row)
            .ok_or_else(|| EcsError::InvariantViolation(format!("entity {id} lost its new component")))
    }

    /// Removes a component, destroying it. No-op if absent.
    pub fn remove_component<C: Component>(&mut self, id: EntityId) {
        recovered(self.try_remove_component::<C>(id), "remove_component");
    }

    /// Removes a component, destroying it.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], [`EcsError::UnregisteredComponent`],
    /// [`EcsError::ComponentMissing`] or [`EcsError::DispatchInProgress`].
    pub fn try_remove_component<C: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        self.ensure_idle()?;
        let type_id = self.registered_id::<C>()?;
        let record = self.record(id)?;

        let signature = self.archetypes[record.archetype.0].signature();
        if !signature.contains(type_id) {
            return Err(EcsError::ComponentMissing {
                entity: id,
                component: self.components.name_of(type_id).to_string(),
            });
        }
        let target_signature = signature.without(type_id);
        let target = self.find_or_create_archetype(target_signature);

        // The target is a subset of the source, so nothing is filled.
        self.migrate(id, record, target, Column::fill_default);
        self.after_mutation();
        Ok(())
    }

    /// Returns a component of an entity.
    #[must_use]
    pub fn get_component<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.try_get_component(id).ok()
    }

    /// Returns a component of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], [`EcsError::UnregisteredComponent`] or
    /// [`EcsError::ComponentMissing`].
    pub fn try_get_component<C: Component>(&self, id: EntityId) -> EcsResult<&C> {
        let type_id = self.registered_id::<C>()?;
        let record = self.record(id)?;
        self.archetypes[record.archetype.0]
            .get::<C>(type_id, record.row)
            .ok_or_else(|| self.missing(id, type_id))
    }

    /// Returns a component of an entity for modification.
    pub fn get_component_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.try_get_component_mut(id).ok()
    }

    /// Returns a component of an entity for modification.
    ///
    /// # Errors
    ///
    /// Same as [`World::try_get_component`].
    pub fn try_get_component_mut<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        let type_id = self.registered_id::<C>()?;
        let record = self.record(id)?;
        if !self.archetypes[record.archetype.0].has(type_id) {
            return Err(self.missing(id, type_id));
        }
        self.archetypes[record.archetype.0]
            .get_mut::<C>(type_id, record.row)
            .ok_or_else(|| EcsError::InvariantViolation(format!("entity {id} row out of range")))
    }

    /// Checks if an entity has a component.
    #[must_use]
    pub fn has_component<C: Component>(&self, id: EntityId) -> bool {
        match (self.component_type_id::<C>(), self.directory.get(id)) {
            (Some(type_id), Some(record)) => self.archetypes[record.archetype.0].has(type_id),
            _ => false,
        }
    }

    /// Every entity that has `C`, archetype creation order then row order.
    #[must_use]
    pub fn entities_with<C: Component>(&self) -> Vec<EntityId> {
        let Some(type_id) = self.component_type_id::<C>() else {
            return Vec::new();
        };
        self.archetypes
            .iter()
            .filter(|archetype| archetype.has(type_id))
            .flat_map(|archetype| archetype.entities().iter().copied())
            .collect()
    }

    fn missing(&self, entity: EntityId, type_id: ComponentTypeId) -> EcsError {
        EcsError::ComponentMissing {
            entity,
            component: self.components.name_of(type_id).to_string(),
        }
    }

    // =========================================================================
    // Archetypes
    // =========================================================================

    fn find_or_create_archetype(&mut self, signature: ArchetypeSignature) -> ArchetypeIndex {
        if let Some(&index) = self.archetype_lookup.get(&signature) {
            return index;
        }

        let components = &self.components;
        let ops = signature
            .as_slice()
            .iter()
            .filter_map(|&type_id| components.get(type_id).map(|desc| (type_id, desc.ops())));
        let archetype = Archetype::new(signature.clone(), ops, self.config.initial_column_capacity);

        let index = ArchetypeIndex(self.archetypes.len());
        tracing::debug!("Created archetype {} with {} components", index.0, signature.len());
        self.archetypes.push(archetype);
        self.archetype_lookup.insert(signature, index);
        index
    }

    /// Moves an entity's row to `to` and fixes up the directory, including
    /// the entity relocated by the swap-remove. Returns the new row.
    fn migrate(
        &mut self,
        id: EntityId,
        from: Record,
        to: ArchetypeIndex,
        fill: impl FnMut(&mut Column),
    ) -> usize {
        let (src, dst) = pair_mut(&mut self.archetypes, from.archetype.0, to.0);
        let moved = src.move_row(from.row, dst, fill);

        if let Some(relocated) = moved.relocated {
            self.directory.relocate(relocated, from.archetype, from.row);
        }
        self.directory.relocate(id, to, moved.new_row);

        tracing::trace!(
            "Moved entity {} from archetype {} to archetype {} row {}",
            id,
            from.archetype.0,
            to.0,
            moved.new_row
        );
        moved.new_row
    }

    /// Archetype with exactly this signature.
    #[must_use]
    pub fn archetype(&self, signature: &ArchetypeSignature) -> Option<&Archetype> {
        self.archetype_lookup
            .get(signature)
            .map(|index| &self.archetypes[index.0])
    }

    /// All archetypes, creation order.
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Number of archetypes, including the empty one.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Signature of the archetype an entity lives in.
    #[must_use]
    pub fn archetype_signature_of(&self, id: EntityId) -> Option<&ArchetypeSignature> {
        let record = self.directory.get(id)?;
        Some(self.archetypes[record.archetype.0].signature())
    }

    /// Component names of an entity, signature order.
    #[must_use]
    pub fn entity_component_names(&self, id: EntityId) -> Option<Vec<&str>> {
        let signature = self.archetype_signature_of(id)?;
        Some(
            signature
                .as_slice()
                .iter()
                .map(|&type_id| self.components.name_of(type_id))
                .collect(),
        )
    }

    /// Signature for a set of registered component types.
    ///
    /// `None` if any type is unregistered.
    #[must_use]
    pub fn signature_of(&self, types: &[ComponentTypeId]) -> Option<ArchetypeSignature> {
        types
            .iter()
            .all(|&type_id| self.components.contains(type_id))
            .then(|| ArchetypeSignature::new(types.to_vec()))
    }

    /// Typed column of `C` in the archetype with this signature.
    #[must_use]
    pub fn column<C: Component>(&self, signature: &ArchetypeSignature) -> Option<&[C]> {
        let type_id = self.component_type_id::<C>()?;
        self.archetype(signature)?.column_slice::<C>(type_id)
    }

    /// Raw bytes of a column, for copying plain-data components into GPU
    /// buffers.
    #[must_use]
    pub fn column_bytes<C: Component + Pod>(&self, signature: &ArchetypeSignature) -> Option<&[u8]> {
        self.column::<C>(signature)
            .map(|column| bytemuck::cast_slice::<C, u8>(column))
    }

    /// Read access to the entity directory.
    #[must_use]
    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Appends a system to a layer.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystemComponent`] if the system declares a
    /// component type twice, or [`EcsError::DispatchInProgress`].
    pub fn register_system<S: ComponentSet>(&mut self, layer: u8, system: System<S>) -> EcsResult<()> {
        self.ensure_idle()?;
        let name = system.name().to_string();
        let bound = system.bind(&mut self.types)?;
        self.scheduler.push(layer, bound);
        tracing::debug!("Registered system {} in layer {}", name, layer);
        Ok(())
    }

    /// Runs the init callback of every system in a layer, registration order.
    pub fn init_systems(&mut self, layer: u8) {
        if let Some(systems) = self.scheduler.layer_mut(layer) {
            for system in systems.iter_mut() {
                system.init();
            }
        }
    }

    /// Runs every system of a layer once, registration order, then applies
    /// queued commands. Unknown layers are ignored.
    pub fn run_systems(&mut self, layer: u8, dt: f32) {
        if self.dispatching {
            tracing::warn!("Ignoring nested run of layer {}", layer);
            return;
        }
        let Some(systems) = self.scheduler.layer_mut(layer) else {
            return;
        };

        {
            // Cleared on unwind too, so a panicking system does not lock the world.
            let _guard = DispatchGuard::set(&mut self.dispatching);
            for system in systems.iter_mut() {
                let seen = dispatch(system.as_mut(), &mut self.archetypes, &self.archetype_lookup, dt);
                tracing::trace!("System {} saw {} entities", system.name(), seen);
            }
        }

        self.apply_commands();
    }

    /// Number of registered systems in all layers.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.scheduler.system_count()
    }

    /// System names of a layer, run order.
    #[must_use]
    pub fn layer_system_names(&self, layer: u8) -> Vec<String> {
        self.scheduler.system_names(layer)
    }

    /// The system scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Checks if systems are being dispatched.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    // =========================================================================
    // Deferred commands
    // =========================================================================

    /// Handle for recording structural changes from inside systems.
    #[must_use]
    pub fn command_queue(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// Applies queued commands in recording order. Returns how many ran.
    ///
    /// Commands recorded while applying stay queued for the next call.
    pub fn apply_commands(&mut self) -> usize {
        if self.dispatching {
            return 0;
        }
        let commands = self.commands.drain();
        let count = commands.len();
        for command in commands {
            command.apply(self);
        }
        if count > 0 {
            tracing::trace!("Applied {} queued commands", count);
        }
        count
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Checks that the directory and archetype storage agree.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvariantViolation`] describing the first mismatch.
    pub fn validate(&self) -> EcsResult<()> {
        let mut stored = 0;
        for (index, archetype) in self.archetypes.iter().enumerate() {
            if !archetype.columns_in_sync() {
                return Err(EcsError::InvariantViolation(format!(
                    "archetype {index} has columns out of sync with its {} entities",
                    archetype.len()
                )));
            }
            if self.archetype_lookup.get(archetype.signature()) != Some(&ArchetypeIndex(index)) {
                return Err(EcsError::InvariantViolation(format!(
                    "archetype {index} is missing from the signature lookup"
                )));
            }
            stored += archetype.len();
        }

        for (id, record) in self.directory.iter() {
            let found = self
                .archetypes
                .get(record.archetype.0)
                .and_then(|archetype| archetype.entity_at(record.row));
            if found != Some(id) {
                return Err(EcsError::InvariantViolation(format!(
                    "entity {id} recorded at archetype {} row {} which holds {found:?}",
                    record.archetype.0, record.row
                )));
            }
        }

        if stored != self.directory.len() {
            return Err(EcsError::InvariantViolation(format!(
                "{stored} stored rows for {} live entities",
                self.directory.len()
            )));
        }
        Ok(())
    }

    fn ensure_idle(&self) -> EcsResult<()> {
        if self.dispatching {
            return Err(EcsError::DispatchInProgress);
        }
        Ok(())
    }

    fn after_mutation(&self) {
        if !self.config.validate_on_mutation {
            return;
        }
        let result = self.validate();
        if let Err(err) = &result {
            tracing::warn!("World invariant broken: {}", err);
        }
        debug_assert!(result.is_ok(), "{result:?}");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.directory.len())
            .field("components", &self.components.len())
            .field("archetypes", &self.archetypes.len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Logs a failed request and converts it to `None`.
fn recovered<T>(result: EcsResult<T>, operation: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("{} ignored: {}", operation, err);
            None
        }
    }
}

/// Holds the dispatch flag for the duration of a layer pass.
struct DispatchGuard<'a>(&'a mut bool);

impl<'a> DispatchGuard<'a> {
    fn set(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Two distinct elements of a slice, mutably.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "source and target archetype must differ");
    if a < b {
        let (low, high) = items.split_at_mut(b);
        (&mut low[a], &mut high[0])
    } else {
        let (low, high) = items.split_at_mut(a);
        (&mut high[0], &mut low[b])
    }
}

/// Borrowed handle to one live entity.
///
/// ```rust,ignore
/// let player = world
///     .spawn()
///     .with(Transform::default())
///     .with(Health(100.0))
///     .id();
/// ```
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl<'w> EntityMut<'w> {
    /// The entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Adds a default-constructed component.
    pub fn add<C: Component>(&mut self) -> Option<&mut C> {
        self.world.add_component::<C>(self.id)
    }

    /// Adds a component with a value.
    pub fn add_with<C: Component>(&mut self, value: C) -> Option<&mut C> {
        self.world.add_component_with(self.id, value)
    }

    /// Adds a component with a value, builder style.
    pub fn with<C: Component>(mut self, value: C) -> Self {
        self.world.add_component_with(self.id, value);
        self
    }

    /// Removes a component.
    pub fn remove<C: Component>(&mut self) {
        self.world.remove_component::<C>(self.id);
    }

    /// Returns a component.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.world.get_component::<C>(self.id)
    }

    /// Returns a component for modification.
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.world.get_component_mut::<C>(self.id)
    }

    /// Checks if the entity has a component.
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.world.has_component::<C>(self.id)
    }

    /// Removes the entity.
    pub fn despawn(mut self) {
        self.world.remove_entity(self.id);
    }
}

impl std::fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityMut").field(&self.id).finish()
    }
}
