//! Map generation and save codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spirecrawl_core::generation::{generate_map, MapConfig};
use spirecrawl_core::persistence::{decode, encode, SaveData, SaveFormat};

fn standard_config() -> MapConfig {
    MapConfig::from_json_str(include_str!("../../../data/map_config.json"))
        .expect("shipped config is valid")
}

fn bench_generate(c: &mut Criterion) {
    let config = standard_config();
    let mut group = c.benchmark_group("generation/generate_map");

    group.bench_function("standard", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| generate_map(black_box(&config), black_box(0), &mut rng));
    });

    let mut wide = config.clone();
    for layer in wide.layers.iter_mut().filter(|l| l.node_count.is_some() && !l.is_boss_layer()) {
        layer.node_count = layer.node_count.map(|n| n * 4);
    }
    wide.extra_paths = 40;
    group.bench_function("wide", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| generate_map(black_box(&wide), black_box(0), &mut rng));
    });

    group.finish();
}

fn bench_save_codec(c: &mut Criterion) {
    let config = standard_config();
    let map = generate_map(&config, 0, &mut ChaCha8Rng::seed_from_u64(7)).expect("generates");
    let data = SaveData::new(&map, 0);
    let mut group = c.benchmark_group("generation/save_codec");

    for (name, format) in [("json", SaveFormat::Json), ("binary", SaveFormat::Binary)] {
        let bytes = encode(&data, format).expect("encodes");
        group.bench_function(format!("encode_{name}"), |b| {
            b.iter(|| encode(black_box(&data), format));
        });
        group.bench_function(format!("decode_{name}"), |b| {
            b.iter_batched(
                || bytes.clone(),
                |bytes| decode(&bytes, format),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_save_codec);
criterion_main!(benches);
