use core::hint::black_box;

use collision_bench::ChainingMap;
use collision_bench::CompactOpenAddressingMap;
use collision_bench::HashMapCore;
use collision_bench::KeyPattern;
use collision_bench::KeySpace;
use collision_bench::OpenAddressingMap;
use collision_bench::OperationPreset;
use collision_bench::ProbeStats;
use collision_bench::Workload;
use collision_bench::WorkloadGenerator;
use collision_bench::hash::DefaultHashBuilder;
use collision_bench::runner::BenchmarkRunner;
use collision_bench::runner::Payload;
use collision_bench::workload::Operation;
use criterion::BatchSize;
use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;

const SEED: u64 = 0x5EED;
const INITIAL_CAPACITY: usize = 1 << 12;
const KEY_COUNT: usize = 1 << 16;
const OPERATIONS: usize = 1 << 18;

/// hashbrown behind the same contract, as a baseline.
struct HashbrownMap {
    map: hashbrown::HashMap<u64, Payload, DefaultHashBuilder>,
}

impl HashbrownMap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: hashbrown::HashMap::with_capacity_and_hasher(
                capacity,
                DefaultHashBuilder::default(),
            ),
        }
    }
}

impl HashMapCore<u64, Payload> for HashbrownMap {
    const NAME: &'static str = "hashbrown";

    fn insert(&mut self, key: u64, value: Payload) -> Option<Payload> {
        self.map.insert(key, value)
    }

    fn get(&self, key: &u64) -> Option<&Payload> {
        self.map.get(key)
    }

    fn remove(&mut self, key: &u64) -> Option<Payload> {
        self.map.remove(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn capacity(&self) -> usize {
        self.map.capacity()
    }

    fn max_load_factor(&self) -> f64 {
        0.875
    }

    fn probe_stats(&self) -> ProbeStats {
        ProbeStats::new()
    }
}

fn workloads() -> Vec<Workload> {
    let mut workloads = vec![Workload::LoadFactor {
        initial_capacity: KEY_COUNT,
        checkpoints: vec![0.25, 0.5, 0.65, 0.75, 0.9],
    }];
    workloads.extend(
        KeyPattern::ALL
            .into_iter()
            .map(|pattern| Workload::KeyDistribution {
                key_count: KEY_COUNT,
                key_space: KeySpace::new(pattern),
            }),
    );
    workloads.extend(
        OperationPreset::ALL
            .into_iter()
            .map(|preset| Workload::OperationMix {
                initial_size: KEY_COUNT,
                operations: OPERATIONS,
                preset,
            }),
    );
    workloads.push(Workload::Phases {
        key_count: KEY_COUNT,
    });
    workloads
}

fn bench_layout<M>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    ops: &[Operation],
    make_map: impl Fn() -> M,
) where
    M: HashMapCore<u64, Payload>,
{
    group.bench_function(M::NAME, |b| {
        b.iter_batched(
            &make_map,
            |map| {
                let mut runner = BenchmarkRunner::new(map);
                black_box(runner.replay(ops));
                runner.into_map()
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_workloads(c: &mut Criterion) {
    for workload in workloads() {
        let ops = WorkloadGenerator::new(SEED).generate(&workload);
        let map_ops = ops
            .iter()
            .filter(|op| !matches!(op, Operation::Checkpoint(_)))
            .count();
        let capacity = match &workload {
            Workload::LoadFactor {
                initial_capacity, ..
            } => *initial_capacity,
            _ => INITIAL_CAPACITY,
        };

        let mut group = c.benchmark_group(workload.label());
        group.sample_size(20);
        group.throughput(Throughput::Elements(map_ops as u64));

        bench_layout(&mut group, &ops, || {
            ChainingMap::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
        });
        bench_layout(&mut group, &ops, || {
            OpenAddressingMap::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
        });
        bench_layout(&mut group, &ops, || {
            CompactOpenAddressingMap::with_capacity_and_hasher(
                capacity,
                DefaultHashBuilder::default(),
            )
        });
        bench_layout(&mut group, &ops, || HashbrownMap::with_capacity(capacity));

        group.finish();
    }
}

criterion_group!(benches, bench_workloads);

criterion_main!(benches);
