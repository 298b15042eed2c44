//! # Archetype-based Entity Storage
//!
//! Entities with the same set of component types share one archetype.
//! Inside an archetype every component type owns a contiguous column:
//!
//! ```text
//! Archetype {Transform, Graphics}:
//! entities:  [E4, E9, E2, ...]
//! Transform: [T0, T1, T2, ...]
//! Graphics:  [G0, G1, G2, ...]
//! ```
//!
//! Row `i` of every column and of the entity list describe the same entity.
//! Rows are removed with swap-remove so storage stays dense; the caller
//! fixes up the directory entry of the entity that was relocated.

// SAFETY: Columns are raw allocations driven by `ComponentOps`.
// Every unsafe block states the invariant it relies on.
#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use super::component::ComponentOps;
use super::entity::EntityId;
use super::type_registry::ComponentTypeId;

/// Canonical set of component types: sorted ascending, no duplicates.
///
/// Two signatures are equal exactly when they describe the same set,
/// regardless of the order the types were added in.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeSignature {
    /// Sorted list of component type ids.
    components: Vec<ComponentTypeId>,
}

impl ArchetypeSignature {
    /// Creates a signature from component types in any order.
    #[must_use]
    pub fn new(mut components: Vec<ComponentTypeId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// The signature of entities without components.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if this signature contains a component type.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.components.binary_search(&type_id).is_ok()
    }

    /// Position of a component type within the signature.
    #[must_use]
    pub fn index_of(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.components.binary_search(&type_id).ok()
    }

    /// Returns this signature plus one component type.
    #[must_use]
    pub fn with(&self, type_id: ComponentTypeId) -> Self {
        let mut components = self.components.clone();
        if let Err(at) = components.binary_search(&type_id) {
            components.insert(at, type_id);
        }
        Self { components }
    }

    /// Returns this signature minus one component type.
    #[must_use]
    pub fn without(&self, type_id: ComponentTypeId) -> Self {
        let mut components = self.components.clone();
        if let Ok(at) = components.binary_search(&type_id) {
            components.remove(at);
        }
        Self { components }
    }

    /// Checks if every type of `other` is also in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.components.iter().all(|&id| self.contains(id))
    }

    /// Component types in ascending id order.
    #[must_use]
    pub fn as_slice(&self) -> &[ComponentTypeId] {
        &self.components
    }

    /// Returns the number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<ComponentTypeId> for ArchetypeSignature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Position of an archetype in the world's archetype table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArchetypeIndex(pub(crate) usize);

impl ArchetypeIndex {
    /// Index of the archetype every new entity starts in.
    pub const EMPTY: Self = Self(0);

    /// Returns the raw table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Type-erased, densely packed array of one component type.
pub(crate) struct Column {
    type_id: ComponentTypeId,
    ops: ComponentOps,
    /// Start of the allocation; dangling (but aligned) while unallocated.
    data: NonNull<u8>,
    /// Number of initialized rows.
    len: usize,
    /// Rows that fit in the allocation. `usize::MAX` for zero-sized types.
    capacity: usize,
}

// SAFETY: Columns only hold values of `Component` types, which are
// `Send + Sync`.
unsafe impl Send for Column {}
// SAFETY: See above.
unsafe impl Sync for Column {}

impl Column {
    fn new(type_id: ComponentTypeId, ops: ComponentOps, capacity: usize) -> Self {
        let mut column = Self {
            type_id,
            ops,
            data: dangling(ops.align),
            len: 0,
            capacity: if ops.size == 0 { usize::MAX } else { 0 },
        };
        if capacity > 0 && ops.size > 0 {
            column.grow_to(capacity);
        }
        column
    }

    #[inline]
    pub(crate) fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn layout_for(&self, capacity: usize) -> Layout {
        self.ops
            .size
            .checked_mul(capacity)
            .and_then(|bytes| Layout::from_size_align(bytes, self.ops.align).ok())
            .unwrap_or_else(|| panic!("column capacity overflow"))
    }

    /// Reallocates to hold `capacity` rows. Never called for zero-sized types.
    fn grow_to(&mut self, capacity: usize) {
        debug_assert!(self.ops.size > 0 && capacity > self.capacity);
        let new_layout = self.layout_for(capacity);

        // SAFETY: `new_layout` has non-zero size. When reallocating, `data`
        // was allocated with `layout_for(self.capacity)`.
        let raw = unsafe {
            if self.capacity == 0 {
                alloc::alloc(new_layout)
            } else {
                alloc::realloc(
                    self.data.as_ptr(),
                    self.layout_for(self.capacity),
                    new_layout.size(),
                )
            }
        };

        let Some(data) = NonNull::new(raw) else {
            alloc::handle_alloc_error(new_layout);
        };
        self.data = data;
        self.capacity = capacity;
    }

    #[inline]
    fn reserve_one(&mut self) {
        if self.len == self.capacity {
            let capacity = self.capacity.saturating_mul(2).max(4);
            self.grow_to(capacity);
        }
    }

    /// Address of a row.
    ///
    /// # Safety
    ///
    /// `row` must be `<= capacity`.
    #[inline]
    unsafe fn ptr_at(&self, row: usize) -> *mut u8 {
        self.data.as_ptr().add(row * self.ops.size)
    }

    /// Default-constructs a new row via the component's construct operation.
    fn push_default(&mut self) {
        self.reserve_one();
        // SAFETY: `reserve_one` guarantees room for row `len`, which is
        // uninitialized.
        unsafe { (self.ops.construct)(self.ptr_at(self.len)) };
        self.len += 1;
    }

    /// Moves `value` into a new row. Returns `false` (dropping `value`) if
    /// the column does not hold `C`.
    fn push<C: 'static>(&mut self, value: C) -> bool {
        if !self.ops.is::<C>() {
            return false;
        }
        self.reserve_one();
        // SAFETY: Type checked above; row `len` is in bounds and
        // uninitialized.
        unsafe { std::ptr::write(self.ptr_at(self.len).cast::<C>(), value) };
        self.len += 1;
        true
    }

    /// Relocates a value from `src` into a new row.
    ///
    /// # Safety
    ///
    /// `src` must point to an initialized value of this column's type that
    /// the caller treats as uninitialized afterwards.
    unsafe fn push_relocated(&mut self, src: *mut u8) {
        self.reserve_one();
        (self.ops.relocate)(src, self.ptr_at(self.len));
        self.len += 1;
    }

    /// Fills the hole at `row` with the last row and shrinks by one.
    ///
    /// # Safety
    ///
    /// `row < len` and the value at `row` must already have been moved out
    /// or destroyed.
    unsafe fn forget_swap_remove(&mut self, row: usize) {
        let last = self.len - 1;
        if row != last {
            (self.ops.relocate)(self.ptr_at(last), self.ptr_at(row));
        }
        self.len = last;
    }

    /// Destroys the value at `row` and swap-removes it.
    fn swap_remove(&mut self, row: usize) {
        assert!(row < self.len, "column row out of bounds");
        // SAFETY: `row < len`, so the value is initialized; it is destroyed
        // before the hole is filled.
        unsafe {
            (self.ops.destroy)(self.ptr_at(row));
            self.forget_swap_remove(row);
        }
    }

    /// Destroys every value, keeping the allocation.
    fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        for row in 0..len {
            // SAFETY: Rows below the old length are initialized and each is
            // destroyed once.
            unsafe { (self.ops.destroy)(self.ptr_at(row)) };
        }
    }

    fn get<C: 'static>(&self, row: usize) -> Option<&C> {
        if !self.ops.is::<C>() || row >= self.len {
            return None;
        }
        // SAFETY: Type checked; `row < len` is initialized.
        Some(unsafe { &*self.ptr_at(row).cast::<C>() })
    }

    fn get_mut<C: 'static>(&mut self, row: usize) -> Option<&mut C> {
        if !self.ops.is::<C>() || row >= self.len {
            return None;
        }
        // SAFETY: Type checked; `row < len` is initialized; `&mut self`
        // makes the borrow unique.
        Some(unsafe { &mut *self.ptr_at(row).cast::<C>() })
    }

    fn as_slice<C: 'static>(&self) -> Option<&[C]> {
        if !self.ops.is::<C>() {
            return None;
        }
        // SAFETY: `data` is non-null and aligned for `C`; the first `len`
        // rows are initialized values of `C`.
        Some(unsafe { std::slice::from_raw_parts(self.data.as_ptr().cast::<C>(), self.len) })
    }

    fn as_mut_slice<C: 'static>(&mut self) -> Option<&mut [C]> {
        if !self.ops.is::<C>() {
            return None;
        }
        // SAFETY: As in `as_slice`, with uniqueness from `&mut self`.
        Some(unsafe {
            std::slice::from_raw_parts_mut(self.data.as_ptr().cast::<C>(), self.len)
        })
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        self.clear();
        if self.ops.size > 0 && self.capacity > 0 {
            // SAFETY: Allocated in `grow_to` with this layout.
            unsafe { alloc::dealloc(self.data.as_ptr(), self.layout_for(self.capacity)) };
        }
    }
}

/// Non-null pointer carrying only an alignment, for unallocated columns.
fn dangling(align: usize) -> NonNull<u8> {
    NonNull::new(align as *mut u8).unwrap_or(NonNull::dangling())
}

/// Result of moving one entity's row between archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MovedRow {
    /// Row of the entity in the destination archetype.
    pub(crate) new_row: usize,
    /// Entity that swap-remove relocated into the vacated source row.
    pub(crate) relocated: Option<EntityId>,
}

/// A single archetype - stores all entities with the same component set.
pub struct Archetype {
    /// Signature identifying this archetype.
    signature: ArchetypeSignature,
    /// One column per signature entry, same order.
    columns: Vec<Column>,
    /// Entity IDs in this archetype (for reverse lookup).
    entities: Vec<EntityId>,
}

impl Archetype {
    /// Creates an archetype with one column per `(type, ops)` pair.
    pub(crate) fn new(
        signature: ArchetypeSignature,
        ops: impl IntoIterator<Item = (ComponentTypeId, ComponentOps)>,
        capacity: usize,
    ) -> Self {
        let mut columns: Vec<Column> = ops
            .into_iter()
            .map(|(type_id, ops)| Column::new(type_id, ops, capacity))
            .collect();
        columns.sort_unstable_by_key(Column::type_id);
        debug_assert!(columns
            .iter()
            .map(Column::type_id)
            .eq(signature.as_slice().iter().copied()));

        Self {
            signature,
            columns,
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Returns the signature of this archetype.
    #[must_use]
    pub fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Returns the number of entities in this archetype.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns a slice of all entity IDs, in row order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Gets the entity ID at a row.
    #[must_use]
    pub fn entity_at(&self, row: usize) -> Option<EntityId> {
        self.entities.get(row).copied()
    }

    /// Checks if the archetype stores a component type.
    #[must_use]
    pub fn has(&self, type_id: ComponentTypeId) -> bool {
        self.signature.contains(type_id)
    }

    /// Number of rows in a component column.
    #[must_use]
    pub fn column_len(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.column(type_id).map(Column::len)
    }

    /// Rows the column can hold before reallocating.
    #[must_use]
    pub fn column_capacity(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.column(type_id).map(Column::capacity)
    }

    /// Typed view of a column. `None` if absent or not of type `C`.
    #[must_use]
    pub fn column_slice<C: 'static>(&self, type_id: ComponentTypeId) -> Option<&[C]> {
        self.column(type_id)?.as_slice()
    }

    /// Mutable typed view of a column.
    pub fn column_slice_mut<C: 'static>(&mut self, type_id: ComponentTypeId) -> Option<&mut [C]> {
        self.column_mut(type_id)?.as_mut_slice()
    }

    /// Typed access to one component.
    #[must_use]
    pub fn get<C: 'static>(&self, type_id: ComponentTypeId, row: usize) -> Option<&C> {
        self.column(type_id)?.get(row)
    }

    /// Mutable typed access to one component.
    pub fn get_mut<C: 'static>(&mut self, type_id: ComponentTypeId, row: usize) -> Option<&mut C> {
        self.column_mut(type_id)?.get_mut(row)
    }

    fn column(&self, type_id: ComponentTypeId) -> Option<&Column> {
        self.signature.index_of(type_id).map(|at| &self.columns[at])
    }

    fn column_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut Column> {
        self.signature.index_of(type_id).map(|at| &mut self.columns[at])
    }

    /// Checks that every column has exactly one row per entity.
    #[must_use]
    pub fn columns_in_sync(&self) -> bool {
        self.columns.iter().all(|column| column.len() == self.entities.len())
    }

    /// Appends an entity with every component default-constructed.
    pub(crate) fn push_default_row(&mut self, id: EntityId) -> usize {
        for column in &mut self.columns {
            column.push_default();
        }
        self.entities.push(id);
        self.entities.len() - 1
    }

    /// Moves the entity at `row` into `dst`.
    ///
    /// Columns in both archetypes are relocated. Columns only in `self` are
    /// destroyed. Each column only in `dst` receives exactly one value from
    /// `fill`, which runs before anything is moved.
    pub(crate) fn move_row(
        &mut self,
        row: usize,
        dst: &mut Archetype,
        mut fill: impl FnMut(&mut Column),
    ) -> MovedRow {
        assert!(row < self.entities.len(), "archetype row out of bounds");
        let entity = self.entities[row];

        for column in &mut dst.columns {
            if !self.signature.contains(column.type_id) {
                fill(column);
            }
        }

        for column in &mut dst.columns {
            if let Some(at) = self.signature.index_of(column.type_id) {
                // SAFETY: `row < len` for every source column (columns stay
                // in sync); the slot is forgotten below.
                unsafe { column.push_relocated(self.columns[at].ptr_at(row)) };
            }
        }

        for column in &mut self.columns {
            if !dst.signature.contains(column.type_id) {
                // SAFETY: Initialized and not relocated above.
                unsafe { (column.ops.destroy)(column.ptr_at(row)) };
            }
            // SAFETY: The value at `row` was relocated or destroyed.
            unsafe { column.forget_swap_remove(row) };
        }

        dst.entities.push(entity);
        debug_assert!(dst.columns_in_sync());

        MovedRow {
            new_row: dst.entities.len() - 1,
            relocated: self.swap_remove_entity(row),
        }
    }

    /// Destroys every component of the entity at `row` and swap-removes it.
    ///
    /// Returns the entity relocated into `row`, if any.
    pub(crate) fn remove_row(&mut self, row: usize) -> Option<EntityId> {
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.swap_remove_entity(row)
    }

    fn swap_remove_entity(&mut self, row: usize) -> Option<EntityId> {
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Destroys every row, keeping the column allocations.
    pub(crate) fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.entities.clear();
    }

    /// Base pointers of the requested columns, in request order.
    ///
    /// `None` if any type is not stored here.
    pub(crate) fn column_ptrs(&mut self, types: &[ComponentTypeId]) -> Option<Vec<NonNull<u8>>> {
        types
            .iter()
            .map(|&type_id| self.column_mut(type_id).map(|column| column.data))
            .collect()
    }
}

impl Column {
    /// Writes `value` when this is the column of `C`, otherwise
    /// default-constructs. Used as a `move_row` fill.
    pub(crate) fn fill_with<C: 'static>(&mut self, value: &mut Option<C>) {
        match value.take() {
            Some(value) if self.ops.is::<C>() => {
                self.push(value);
            }
            other => {
                *value = other;
                self.push_default();
            }
        }
    }

    /// Default-constructs one row. Used as a `move_row` fill.
    pub(crate) fn fill_default(&mut self) {
        self.push_default();
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("signature", &self.signature)
            .field("len", &self.entities.len())
            .finish_non_exhaustive()
    }
}
