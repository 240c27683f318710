use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use tickstage::component::Store;
use tickstage::system::System;
use tickstage::world::World;

struct A(#[expect(unused)] u32);

struct B(#[expect(unused)] u64);

#[derive(Default)]
struct ASystem {
    store: Store<A>,
}

impl System for ASystem {
    type Component = A;

    fn store(&self) -> &Store<A> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store<A> {
        &mut self.store
    }
}

#[derive(Default)]
struct BSystem {
    store: Store<B>,
}

impl System for BSystem {
    type Component = B;

    fn store(&self) -> &Store<B> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store<B> {
        &mut self.store
    }
}

fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    group.bench_function("create", |bencher| {
        const COUNT: usize = 10_000;

        bencher.iter(|| {
            let mut world = World::new();

            world.register_system(ASystem::default());
            world.register_system(BSystem::default());

            for _ in 0..COUNT {
                _ = world.create_entity(black_box((A(123), B(321))));
            }
        })
    });

    group.bench_function("create_and_destroy", |bencher| {
        const COUNT: usize = 10_000;

        let mut world = World::new();

        world.register_system(ASystem::default());
        world.register_system(BSystem::default());

        bencher.iter(|| {
            let mut uids = Vec::with_capacity(COUNT);

            for _ in 0..COUNT {
                let entity =
                    world.create_entity(black_box((A(123), B(321)))).unwrap();

                uids.push(entity.uid());
            }

            for uid in uids {
                world.destroy_entity_later(uid);
            }

            // four post_updates walk every entity through its lifecycle
            for _ in 0..4 {
                world.post_update();
            }
        })
    });
}

criterion_group!(
    name = this;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(4));
    targets = benchmark,
);
criterion_main!(this);
