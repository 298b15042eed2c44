//! # System Dispatch Benchmark
//!
//! Measures a layer pass over densely packed columns, against a plain
//! `Vec` of structs as the baseline.

#![allow(missing_docs)]
// bytemuck derives expand to unsafe impls.
#![allow(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tessera_core::{EcsConfig, EntityId, MatchMode, System, World};

const ENTITY_COUNT: usize = 100_000;
const PHYSICS_LAYER: u8 = 1;

#[derive(Default, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Default, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Default, Clone, Copy)]
struct Frozen;

fn physics_world(frozen_every: usize) -> World {
    let config = EcsConfig {
        initial_column_capacity: ENTITY_COUNT,
        validate_on_mutation: false,
    };
    let mut world = World::with_config(config);
    world.register_component::<Position>("Position");
    world.register_component::<Velocity>("Velocity");
    world.register_component::<Frozen>("Frozen");

    for i in 0..ENTITY_COUNT {
        let entity = world
            .spawn()
            .with(Position { x: i as f32, y: 0.0, z: 0.0 })
            .with(Velocity { x: 0.1, y: 0.2, z: 0.3 });
        if frozen_every > 0 && i % frozen_every == 0 {
            entity.with(Frozen);
        }
    }
    world
}

fn integrate(
    _dt: f32,
    _entities: &[EntityId],
    positions: &mut [Position],
    velocities: &mut [Velocity],
) {
    for (p, v) in positions.iter_mut().zip(velocities.iter()) {
        p.x += v.x;
        p.y += v.y;
        p.z += v.z;
    }
}

fn bench_baseline_vec(c: &mut Criterion) {
    let mut bodies: Vec<(Position, Velocity)> = (0..ENTITY_COUNT)
        .map(|i| {
            (
                Position { x: i as f32, y: 0.0, z: 0.0 },
                Velocity { x: 0.1, y: 0.2, z: 0.3 },
            )
        })
        .collect();

    c.bench_function("BASELINE_vec_of_structs_100K", |b| {
        b.iter(|| {
            for (p, v) in &mut bodies {
                p.x += v.x;
                p.y += v.y;
                p.z += v.z;
            }
            black_box(bodies.len())
        });
    });
}

fn bench_exact_dispatch(c: &mut Criterion) {
    let mut world = physics_world(0);
    world
        .register_system(PHYSICS_LAYER, System::<(Position, Velocity)>::new("integrate", integrate))
        .ok();

    c.bench_function("exact_dispatch_100K", |b| {
        b.iter(|| {
            world.run_systems(PHYSICS_LAYER, black_box(0.016));
        });
    });
}

fn bench_superset_dispatch(c: &mut Criterion) {
    // A quarter of the entities live in a second archetype.
    let mut world = physics_world(4);
    world
        .register_system(
            PHYSICS_LAYER,
            System::<(Position, Velocity)>::new("integrate", integrate).matching(MatchMode::Superset),
        )
        .ok();

    c.bench_function("superset_dispatch_100K_two_archetypes", |b| {
        b.iter(|| {
            world.run_systems(PHYSICS_LAYER, black_box(0.016));
        });
    });
}

fn bench_column_bytes(c: &mut Criterion) {
    let world = physics_world(0);
    let signature = [world.component_type_id::<Position>(), world.component_type_id::<Velocity>()]
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .and_then(|types| world.signature_of(&types))
        .unwrap_or_default();

    c.bench_function("column_bytes_positions_100K", |b| {
        b.iter(|| black_box(world.column_bytes::<Position>(&signature).map(<[u8]>::len)));
    });
}

criterion_group!(
    benches,
    bench_baseline_vec,
    bench_exact_dispatch,
    bench_superset_dispatch,
    bench_column_bytes,
);

criterion_main!(benches);
