use std::sync::Arc;

use bevy_ecs::prelude::*;
use bodytype_core::host::ecs::{skin_type_registry, spawn_player, PlayerSkin, WorldPlayer};
use bodytype_core::{AppearanceOverrideService, OverrideConfig, PreferenceStore};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use uuid::Uuid;

fn service() -> AppearanceOverrideService {
    AppearanceOverrideService::new(
        Arc::new(PreferenceStore::in_memory()),
        OverrideConfig::builtin(),
        Arc::new(skin_type_registry()),
    )
}

fn populate(world: &mut World, players: usize) -> Vec<(Uuid, Entity)> {
    (0..players)
        .map(|_| {
            let user = Uuid::new_v4();
            (user, spawn_player(world, user))
        })
        .collect()
}

fn bench_toggle_and_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("toggle_apply");

    for players in [1usize, 16, 128] {
        group.bench_with_input(
            BenchmarkId::new("in_memory", players),
            &players,
            |b, &players| {
                b.iter_batched(
                    || {
                        let mut world = World::new();
                        let roster = populate(&mut world, players);
                        (service(), world, roster)
                    },
                    |(service, mut world, roster)| {
                        for (user, entity) in roster {
                            service.toggle(user);
                            let mut player = WorldPlayer::new(&mut world, entity);
                            black_box(service.apply_override(user, &mut player).is_ok());
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let service = service();
    let skin = PlayerSkin::starter();
    let target = service.config().target_index().unwrap_or(0);

    c.bench_function("rebuild_player_skin", |b| {
        b.iter(|| {
            black_box(
                service
                    .adapter()
                    .rebuild(&skin, target, Some("Athletic".to_string()))
                    .is_ok(),
            )
        })
    });
}

criterion_group!(toggle_benches, bench_toggle_and_apply, bench_rebuild);
criterion_main!(toggle_benches);
