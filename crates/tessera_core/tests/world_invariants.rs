//! # World Invariant Tests
//!
//! These tests verify the storage guarantees of the world:
//!
//! 1. **Directory consistency**: every live entity is found at its recorded row
//! 2. **Column lengths**: every column matches its archetype's entity list
//! 3. **Round trip**: add then remove returns to the same archetype
//! 4. **Swap-remove**: only the last row moves, only its record changes
//! 5. **Registration**: duplicates keep the first type id and descriptor
//! 6. **Ids**: strictly increasing, never null
//!
//! Run with: cargo test --test world_invariants

use tessera_core::{EcsError, EntityId, World};

#[derive(Default, Clone, Copy, Debug, PartialEq)]
struct Transform {
    x: f32,
    y: f32,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
struct Graphics {
    texture: u32,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
struct Physics {
    mass: f32,
}

#[derive(Default, Clone, Debug, PartialEq)]
struct Label(String);

fn world() -> World {
    let mut world = World::new();
    world.register_component::<Transform>("Transform");
    world.register_component::<Graphics>("Graphics");
    world.register_component::<Physics>("Physics");
    world.register_component::<Label>("Label");
    world
}

/// Deterministic xorshift sequence.
struct Rng(u64);

impl Rng {
    fn next(&mut self, max: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % max as u64) as usize
    }
}

fn assert_storage_consistent(world: &World) {
    assert_eq!(world.validate(), Ok(()));

    for archetype in world.archetypes() {
        for &type_id in archetype.signature().as_slice() {
            assert_eq!(archetype.column_len(type_id), Some(archetype.len()));
        }
    }

    for id in world.entities() {
        let record = world.directory().get(id).unwrap();
        let archetype = &world.archetypes()[record.archetype.index()];
        assert_eq!(archetype.entity_at(record.row), Some(id));
    }
}

// ============================================================================
// DIRECTORY AND COLUMNS
// ============================================================================

#[test]
fn verify_storage_after_random_operations() {
    let mut world = world();
    let mut rng = Rng(0xDEAD_BEEF);
    let mut live: Vec<EntityId> = Vec::new();

    for step in 0..2_000 {
        match rng.next(7) {
            0 | 1 => live.push(world.create_entity()),
            2 if !live.is_empty() => {
                let id = live[rng.next(live.len())];
                world.add_component_with(id, Transform { x: step as f32, y: 1.0 });
            }
            3 if !live.is_empty() => {
                let id = live[rng.next(live.len())];
                world.add_component_with(id, Graphics { texture: step });
            }
            4 if !live.is_empty() => {
                let id = live[rng.next(live.len())];
                world.add_component_with(id, Label(format!("entity-{step}")));
            }
            5 if !live.is_empty() => {
                let id = live[rng.next(live.len())];
                match rng.next(3) {
                    0 => world.remove_component::<Transform>(id),
                    1 => world.remove_component::<Graphics>(id),
                    _ => world.remove_component::<Label>(id),
                }
            }
            6 if !live.is_empty() => {
                let id = live.swap_remove(rng.next(live.len()));
                world.remove_entity(id);
            }
            _ => {}
        }

        if step % 50 == 0 {
            assert_storage_consistent(&world);
        }
    }

    assert_storage_consistent(&world);
    assert_eq!(world.entity_count(), live.len());
}

#[test]
fn verify_values_survive_migrations() {
    let mut world = world();
    let ids: Vec<EntityId> = (0..100)
        .map(|i| {
            world
                .spawn()
                .with(Transform { x: i as f32, y: -(i as f32) })
                .with(Label(format!("e{i}")))
                .id()
        })
        .collect();

    for (i, &id) in ids.iter().enumerate() {
        if i % 3 == 0 {
            world.add_component_with(id, Physics { mass: i as f32 });
        }
        if i % 5 == 0 {
            world.add_component::<Graphics>(id);
        }
    }

    for (i, &id) in ids.iter().enumerate() {
        assert_eq!(
            world.get_component::<Transform>(id),
            Some(&Transform { x: i as f32, y: -(i as f32) })
        );
        assert_eq!(world.get_component::<Label>(id), Some(&Label(format!("e{i}"))));
        assert_eq!(world.has_component::<Physics>(id), i % 3 == 0);
        assert_eq!(world.has_component::<Graphics>(id), i % 5 == 0);
    }
    assert_storage_consistent(&world);
}

// ============================================================================
// ROUND TRIP
// ============================================================================

#[test]
fn verify_add_remove_round_trip() {
    let mut world = world();
    let id = world
        .spawn()
        .with(Transform { x: 2.0, y: 3.0 })
        .with(Graphics { texture: 9 })
        .id();
    let before = world.archetype_signature_of(id).cloned();

    world.add_component_with(id, Physics { mass: 80.0 });
    assert_ne!(world.archetype_signature_of(id).cloned(), before);
    world.remove_component::<Physics>(id);

    assert_eq!(world.archetype_signature_of(id).cloned(), before);
    assert_eq!(world.get_component::<Transform>(id), Some(&Transform { x: 2.0, y: 3.0 }));
    assert_eq!(world.get_component::<Graphics>(id), Some(&Graphics { texture: 9 }));
    assert!(world.get_component::<Physics>(id).is_none());
}

// ============================================================================
// SWAP-REMOVE
// ============================================================================

#[test]
fn verify_swap_remove_moves_only_last_row() {
    let mut world = world();
    let ids: Vec<EntityId> = (0..6)
        .map(|i| world.spawn().with(Transform { x: i as f32, y: 0.0 }).id())
        .collect();
    let before: Vec<_> = ids.iter().map(|&id| world.directory().get(id).unwrap()).collect();

    world.remove_entity(ids[2]);

    for (i, &id) in ids.iter().enumerate() {
        match i {
            2 => assert!(world.directory().get(id).is_none()),
            5 => {
                let record = world.directory().get(id).unwrap();
                assert_eq!(record.row, before[2].row);
                assert_eq!(record.archetype, before[2].archetype);
            }
            _ => assert_eq!(world.directory().get(id), Some(before[i])),
        }
    }
    assert_eq!(
        world.get_component::<Transform>(ids[5]),
        Some(&Transform { x: 5.0, y: 0.0 })
    );
    assert_storage_consistent(&world);
}

#[test]
fn verify_removing_last_row_moves_nothing() {
    let mut world = world();
    let ids: Vec<EntityId> = (0..3)
        .map(|_| world.spawn().with(Physics::default()).id())
        .collect();
    let before: Vec<_> = ids.iter().map(|&id| world.directory().get(id).unwrap()).collect();

    world.remove_entity(ids[2]);

    assert_eq!(world.directory().get(ids[0]), Some(before[0]));
    assert_eq!(world.directory().get(ids[1]), Some(before[1]));
    assert_storage_consistent(&world);
}

// ============================================================================
// REGISTRATION AND IDS
// ============================================================================

#[test]
fn verify_duplicate_registration_is_ignored() {
    let mut world = world();
    let type_id = world.component_type_id::<Physics>().unwrap();
    let size = world.component_descriptor::<Physics>().unwrap().size();

    let again = world.register_component::<Physics>("RigidBody");
    assert_eq!(again, type_id);
    assert_eq!(
        world.try_register_component::<Physics>("RigidBody"),
        Err(EcsError::DuplicateComponent {
            name: "Physics".to_string()
        })
    );

    let descriptor = world.component_descriptor::<Physics>().unwrap();
    assert_eq!(descriptor.name(), "Physics");
    assert_eq!(descriptor.type_id(), type_id);
    assert_eq!(descriptor.size(), size);
    assert_eq!(world.component_count(), 4);
    assert_eq!(
        world.registered_component_names(),
        vec!["Transform", "Graphics", "Physics", "Label"]
    );
}

#[test]
fn verify_ids_strictly_increase() {
    let mut world = world();
    let mut previous = EntityId::NULL;

    for i in 0..1_000 {
        let id = if i % 2 == 0 {
            world.create_entity()
        } else {
            world.get_new_id()
        };
        assert!(!id.is_null());
        assert!(id > previous);
        previous = id;

        if i % 7 == 0 && world.contains(id) {
            world.remove_entity(id);
        }
    }
}

#[test]
fn verify_id_counter_reset() {
    let mut world = world();
    for _ in 0..3 {
        world.create_entity();
    }

    world.set_id_counter(100);
    assert_eq!(world.create_entity(), EntityId::new(101));

    // Counter lowered onto live ids.
    world.set_id_counter(1);
    assert_eq!(world.create_entity(), EntityId::new(4));
    assert_storage_consistent(&world);
}

#[test]
fn verify_remove_all_entities() {
    let mut world = world();
    for i in 0..50 {
        let mut entity = world.spawn();
        entity.add_with(Transform { x: i as f32, y: 0.0 });
        if i % 2 == 0 {
            entity.add::<Graphics>();
        }
    }

    world.remove_all_entities();

    assert_eq!(world.entity_count(), 0);
    assert!(world.entities_with::<Transform>().is_empty());
    for archetype in world.archetypes() {
        assert!(archetype.is_empty());
    }
    assert_storage_consistent(&world);
}
