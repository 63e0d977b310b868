use std::hint::black_box;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use utreexo::accumulator::forest::Forest;
use utreexo::accumulator::node_hash::NodeHash;
use utreexo::accumulator::proof::BatchProof;
use utreexo::accumulator::Leaf;

fn build_forest(count: usize, seed: u64) -> (Forest, Vec<NodeHash>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let hashes: Vec<NodeHash> = (0..count)
        .map(|_| {
            let mut bytes = [0u8; 32];
            rng.fill(&mut bytes);
            NodeHash::new(bytes)
        })
        .collect();

    let leaves: Vec<Leaf> = hashes
        .iter()
        .map(|hash| Leaf {
            hash: *hash,
            remember: false,
        })
        .collect();

    let mut forest = Forest::new();
    forest.modify(&leaves, &[]).unwrap();
    (forest, hashes)
}

fn proof_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof_generation");

    let (forest, hashes) = build_forest(1000, 42);
    for target_count in [1usize, 10, 100].iter() {
        let targets = &hashes[..*target_count];

        group.throughput(Throughput::Elements(*target_count as u64));
        group.bench_with_input(
            BenchmarkId::new("prove_batch", target_count),
            target_count,
            |b, _| {
                b.iter(|| {
                    let proof = forest.prove_batch(black_box(targets));
                    black_box(proof.unwrap())
                });
            },
        );
    }
    group.finish();
}

fn proof_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof_verification");

    let (forest, hashes) = build_forest(1000, 42);
    for target_count in [1usize, 10, 100].iter() {
        let targets = &hashes[..*target_count];
        let proof = forest.prove_batch(targets).unwrap();

        group.throughput(Throughput::Elements(*target_count as u64));
        group.bench_with_input(
            BenchmarkId::new("verify_batch", target_count),
            target_count,
            |b, _| {
                b.iter(|| {
                    let valid = forest.verify_batch(black_box(&proof), black_box(targets));
                    black_box(valid.unwrap())
                });
            },
        );
    }
    group.finish();
}

fn proof_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof_serialization");

    let (forest, hashes) = build_forest(1000, 42);
    let proof = forest.prove_batch(&hashes[..100]).unwrap();

    group.bench_function("serialize_100", |b| {
        b.iter(|| {
            let mut buffer = Vec::new();
            proof.serialize(&mut buffer).unwrap();
            black_box(buffer)
        });
    });

    let mut buffer = Vec::new();
    proof.serialize(&mut buffer).unwrap();
    group.bench_function("deserialize_100", |b| {
        b.iter(|| {
            let decoded = BatchProof::deserialize(&mut black_box(buffer.as_slice()));
            black_box(decoded.unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, proof_generation, proof_verification, proof_serialization);
criterion_main!(benches);
