//! # Component System
//!
//! Components are pure data containers with no behavior. Archetype columns
//! hold them as raw bytes, so every registered type carries a
//! [`ComponentOps`] record: size, alignment and three function pointers that
//! construct, relocate and destroy a value at an address without the caller
//! knowing the concrete type.

// Declares the type-erased `unsafe fn` operations used by the columns.
#![allow(unsafe_code)]

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::ptr;

use super::type_registry::ComponentTypeId;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Default`: used to construct a new component in place
/// - `Send + Sync`: a world may be handed between threads
/// - `'static`: stored behind type-erased columns
///
/// Implemented automatically for every qualifying type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Transform {
///     position: [f32; 3],
/// }
///
/// world.register_component::<Transform>("Transform");
/// ```
pub trait Component: Default + Send + Sync + 'static {}

impl<T: Default + Send + Sync + 'static> Component for T {}

/// Type-erased operations for one component type.
#[derive(Clone, Copy)]
pub struct ComponentOps {
    /// Rust type the operations were built for.
    pub(crate) rust_type: TypeId,
    /// Size of one instance in bytes.
    pub(crate) size: usize,
    /// Alignment of one instance.
    pub(crate) align: usize,
    /// Writes `C::default()` into uninitialized memory.
    pub(crate) construct: unsafe fn(*mut u8),
    /// Moves a value from `src` to uninitialized `dst`; `src` is left
    /// logically uninitialized.
    pub(crate) relocate: unsafe fn(*mut u8, *mut u8),
    /// Drops the value in place.
    pub(crate) destroy: unsafe fn(*mut u8),
}

impl ComponentOps {
    /// Builds the operations for a concrete component type.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        unsafe fn construct_impl<C: Component>(dst: *mut u8) {
            ptr::write(dst.cast::<C>(), C::default());
        }

        unsafe fn relocate_impl<C: Component>(src: *mut u8, dst: *mut u8) {
            ptr::copy_nonoverlapping(src.cast::<C>(), dst.cast::<C>(), 1);
        }

        unsafe fn destroy_impl<C: Component>(ptr: *mut u8) {
            ptr::drop_in_place(ptr.cast::<C>());
        }

        Self {
            rust_type: TypeId::of::<C>(),
            size: std::mem::size_of::<C>(),
            align: std::mem::align_of::<C>(),
            construct: construct_impl::<C>,
            relocate: relocate_impl::<C>,
            destroy: destroy_impl::<C>,
        }
    }

    /// Size of one instance in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of one instance.
    #[inline]
    #[must_use]
    pub fn align(&self) -> usize {
        self.align
    }

    /// Checks whether these operations were built for `C`.
    #[inline]
    #[must_use]
    pub fn is<C: 'static>(&self) -> bool {
        self.rust_type == TypeId::of::<C>()
    }
}

impl fmt::Debug for ComponentOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOps")
            .field("size", &self.size)
            .field("align", &self.align)
            .finish_non_exhaustive()
    }
}

/// Registration record for a component type.
#[derive(Clone, Debug)]
pub struct ComponentDescriptor {
    name: String,
    type_id: ComponentTypeId,
    ops: ComponentOps,
}

impl ComponentDescriptor {
    /// Creates the descriptor for `C`.
    #[must_use]
    pub fn new<C: Component>(name: impl Into<String>, type_id: ComponentTypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            ops: ComponentOps::of::<C>(),
        }
    }

    /// Display name given at registration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the component type.
    #[must_use]
    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Size of one instance in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ops.size
    }

    /// Type-erased operations.
    #[must_use]
    pub fn ops(&self) -> ComponentOps {
        self.ops
    }
}

/// All registered component descriptors of a world.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    descriptors: HashMap<ComponentTypeId, ComponentDescriptor>,
    /// Registration order, for introspection.
    order: Vec<ComponentTypeId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a descriptor.
    ///
    /// Returns `false` and leaves the existing descriptor untouched if the
    /// type id is already registered.
    pub fn insert(&mut self, descriptor: ComponentDescriptor) -> bool {
        let type_id = descriptor.type_id;
        if self.descriptors.contains_key(&type_id) {
            return false;
        }
        self.descriptors.insert(type_id, descriptor);
        self.order.push(type_id);
        true
    }

    /// Looks up a descriptor.
    #[must_use]
    pub fn get(&self, type_id: ComponentTypeId) -> Option<&ComponentDescriptor> {
        self.descriptors.get(&type_id)
    }

    /// Checks if a type id is registered.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.descriptors.contains_key(&type_id)
    }

    /// Name of a registered component, or `"<unregistered>"`.
    #[must_use]
    pub fn name_of(&self, type_id: ComponentTypeId) -> &str {
        self.get(type_id).map_or("<unregistered>", ComponentDescriptor::name)
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> + '_ {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }
}
