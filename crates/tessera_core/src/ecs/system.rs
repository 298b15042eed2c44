//! # Systems and Layered Dispatch
//!
//! A system declares the exact set of component types it needs and a
//! per-frame callback. Systems are grouped into numbered layers; within a
//! layer they run strictly in registration order. Layers run only when the
//! caller asks for them.
//!
//! ```rust,ignore
//! world.register_system(
//!     PHYSICS_LAYER,
//!     System::<(Transform, RigidBody)>::new("integrate", |dt, entities, transforms, bodies| {
//!         for i in 0..entities.len() {
//!             transforms[i].position += bodies[i].velocity * dt;
//!         }
//!     }),
//! )?;
//!
//! world.run_systems(PHYSICS_LAYER, dt);
//! ```
//!
//! The callback receives one `&mut [T]` per declared component, all indexed
//! by the same row as the entity slice. Structural changes cannot be made
//! from inside a callback; queue them on a
//! [`CommandQueue`](super::CommandQueue) instead.

// Dispatch hands raw column pointers to the typed callbacks.
#![allow(unsafe_code)]

use std::collections::{BTreeMap, HashMap};
use std::ptr::NonNull;

use super::archetype::{Archetype, ArchetypeIndex, ArchetypeSignature};
use super::component::Component;
use super::entity::EntityId;
use super::type_registry::{ComponentTypeId, TypeRegistry};
use crate::error::{EcsError, EcsResult};

/// Which archetypes a system is run against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Only the archetype whose signature equals the declared set.
    #[default]
    Exact,
    /// Every non-empty archetype containing at least the declared set, one
    /// callback invocation per archetype.
    Superset,
}

/// A tuple of component types a system iterates over.
///
/// Implemented for `(A,)` up to `(A, B, C, D, E, F)`.
pub trait ComponentSet: 'static {
    /// Boxed per-frame callback taking one slice per component.
    type Callback: Send + 'static;

    /// Component type ids in declaration order.
    fn component_ids(types: &mut TypeRegistry) -> Vec<ComponentTypeId>;

    /// Calls the callback.
    ///
    /// # Safety
    ///
    /// When `entities` is non-empty, `columns[i]` must point to the start of
    /// an initialized, exclusively borrowed column of the `i`-th declared
    /// type holding at least `entities.len()` values.
    unsafe fn invoke(
        callback: &mut Self::Callback,
        dt: f32,
        entities: &[EntityId],
        columns: &[NonNull<u8>],
    );
}

/// Builds the slice for one declared column.
///
/// # Safety
///
/// See [`ComponentSet::invoke`].
unsafe fn column_slice<'a, C>(columns: &[NonNull<u8>], index: usize, len: usize) -> &'a mut [C] {
    if len == 0 {
        return std::slice::from_raw_parts_mut(NonNull::<C>::dangling().as_ptr(), 0);
    }
    std::slice::from_raw_parts_mut(columns[index].as_ptr().cast::<C>(), len)
}

/// One-shot setup callback.
type InitCallback = Box<dyn FnMut() + Send>;

/// A system over the component tuple `S`.
pub struct System<S: ComponentSet> {
    name: String,
    update: S::Callback,
    init: Option<InitCallback>,
    match_mode: MatchMode,
}

macro_rules! impl_component_set {
    ($(($ty:ident, $index:tt)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Callback = Box<dyn FnMut(f32, &[EntityId], $(&mut [$ty]),+) + Send>;

            fn component_ids(types: &mut TypeRegistry) -> Vec<ComponentTypeId> {
                vec![$(types.id_of::<$ty>()),+]
            }

            unsafe fn invoke(
                callback: &mut Self::Callback,
                dt: f32,
                entities: &[EntityId],
                columns: &[NonNull<u8>],
            ) {
                let len = entities.len();
                callback(dt, entities, $(column_slice::<$ty>(columns, $index, len)),+);
            }
        }

        impl<$($ty: Component),+> System<($($ty,)+)> {
            /// Creates a system from its per-frame callback.
            pub fn new<Update>(name: impl Into<String>, update: Update) -> Self
            where
                Update: FnMut(f32, &[EntityId], $(&mut [$ty]),+) + Send + 'static,
            {
                let update: Box<dyn FnMut(f32, &[EntityId], $(&mut [$ty]),+) + Send> =
                    Box::new(update);
                Self::from_callback(name.into(), update)
            }
        }
    };
}

impl_component_set!((A, 0));
impl_component_set!((A, 0), (B, 1));
impl_component_set!((A, 0), (B, 1), (C, 2));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));

impl<S: ComponentSet> System<S> {
    fn from_callback(name: String, update: S::Callback) -> Self {
        Self {
            name,
            update,
            init: None,
            match_mode: MatchMode::Exact,
        }
    }

    /// Sets a callback run once by [`World::init_systems`](crate::World::init_systems).
    #[must_use]
    pub fn with_init(mut self, init: impl FnMut() + Send + 'static) -> Self {
        self.init = Some(Box::new(init));
        self
    }

    /// Selects exact or superset archetype matching.
    #[must_use]
    pub fn matching(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// System name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the declared components against a world's type ids.
    pub(crate) fn bind(self, types: &mut TypeRegistry) -> EcsResult<Box<dyn SystemBase>> {
        let declared = S::component_ids(types);
        let signature = ArchetypeSignature::new(declared.clone());
        if signature.len() != declared.len() {
            return Err(EcsError::DuplicateSystemComponent { system: self.name });
        }
        Ok(Box::new(BoundSystem {
            system: self,
            declared,
            signature,
        }))
    }
}

/// Type-erased registered system.
pub(crate) trait SystemBase: Send {
    fn name(&self) -> &str;

    fn match_mode(&self) -> MatchMode;

    /// Required component set, canonical order.
    fn signature(&self) -> &ArchetypeSignature;

    /// Component ids in callback argument order.
    fn declared(&self) -> &[ComponentTypeId];

    fn init(&mut self);

    /// # Safety
    ///
    /// Same contract as [`ComponentSet::invoke`], with `columns` in
    /// [`SystemBase::declared`] order.
    unsafe fn run(&mut self, dt: f32, entities: &[EntityId], columns: &[NonNull<u8>]);
}

struct BoundSystem<S: ComponentSet> {
    system: System<S>,
    declared: Vec<ComponentTypeId>,
    signature: ArchetypeSignature,
}

impl<S: ComponentSet> SystemBase for BoundSystem<S> {
    fn name(&self) -> &str {
        &self.system.name
    }

    fn match_mode(&self) -> MatchMode {
        self.system.match_mode
    }

    fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    fn declared(&self) -> &[ComponentTypeId] {
        &self.declared
    }

    fn init(&mut self) {
        if let Some(init) = self.system.init.as_mut() {
            init();
        }
    }

    unsafe fn run(&mut self, dt: f32, entities: &[EntityId], columns: &[NonNull<u8>]) {
        S::invoke(&mut self.system.update, dt, entities, columns);
    }
}

/// Ordered layers of registered systems.
#[derive(Default)]
pub struct Scheduler {
    layers: BTreeMap<u8, Vec<Box<dyn SystemBase>>>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, layer: u8, system: Box<dyn SystemBase>) {
        self.layers.entry(layer).or_default().push(system);
    }

    pub(crate) fn layer_mut(&mut self, layer: u8) -> Option<&mut Vec<Box<dyn SystemBase>>> {
        self.layers.get_mut(&layer)
    }

    /// Total number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    /// Layers with at least one system, ascending.
    #[must_use]
    pub fn layers(&self) -> Vec<u8> {
        self.layers.keys().copied().collect()
    }

    /// Names of a layer's systems in run order.
    #[must_use]
    pub fn system_names(&self, layer: u8) -> Vec<String> {
        self.layers
            .get(&layer)
            .map(|systems| systems.iter().map(|s| s.name().to_string()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.layers.keys().map(|layer| (layer, self.system_names(*layer))))
            .finish()
    }
}

/// Runs one system against the archetypes it matches.
///
/// Returns the number of entities the callback saw.
pub(crate) fn dispatch(
    system: &mut dyn SystemBase,
    archetypes: &mut [Archetype],
    lookup: &HashMap<ArchetypeSignature, ArchetypeIndex>,
    dt: f32,
) -> usize {
    match system.match_mode() {
        MatchMode::Exact => {
            let Some(&index) = lookup.get(system.signature()) else {
                // SAFETY: No entities, so no column is read.
                unsafe { system.run(dt, &[], &[]) };
                return 0;
            };
            run_on(system, &mut archetypes[index.0], dt)
        }
        MatchMode::Superset => {
            let mut seen = 0;
            let mut invoked = false;
            for archetype in archetypes.iter_mut() {
                if archetype.is_empty() || !archetype.signature().is_superset_of(system.signature()) {
                    continue;
                }
                seen += run_on(system, archetype, dt);
                invoked = true;
            }
            if !invoked {
                // SAFETY: No entities, so no column is read.
                unsafe { system.run(dt, &[], &[]) };
            }
            seen
        }
    }
}

fn run_on(system: &mut dyn SystemBase, archetype: &mut Archetype, dt: f32) -> usize {
    let Some(columns) = archetype.column_ptrs(system.declared()) else {
        return 0;
    };
    let entities = archetype.entities();
    // SAFETY: `columns` holds one base pointer per declared type, each
    // column has `entities.len()` initialized rows, the declared types are
    // distinct (checked in `bind`) and `archetype` is exclusively borrowed
    // for the duration of the call.
    unsafe { system.run(dt, entities, &columns) };
    entities.len()
}
