//! Performance benchmarks for authdex
//!
//! Run with: cargo bench

use authdex::AuthorSearch;
use authdex::index::{MemoryStore, NameCatalog};
use authdex::utils::{DefaultNormalizer, EngineConfig, NameNormalizer, extract_qgrams};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SURNAMES: &[&str] = &[
    "ellis", "smith", "müller", "van der berg", "o'neil", "garcía", "nakamura", "schröder",
    "ivanova", "dupont", "kowalski", "jensen", "rossi", "silva", "chen", "wang",
];

const GIVEN: &[&str] = &["J", "John", "J. R.", "Maria", "A. B.", "Yuki", "Pierre", "Anna"];

/// Deterministic catalog of `authors` authors with a few name variants each
fn synthetic_catalog(authors: u32) -> NameCatalog {
    let mut catalog = NameCatalog::new();
    for author in 0..authors {
        let surname = SURNAMES[author as usize % SURNAMES.len()];
        let suffix = author / SURNAMES.len() as u32;
        for (i, given) in GIVEN.iter().enumerate().take(1 + author as usize % 3) {
            let name = format!("{}{}, {}", surname, suffix, given);
            for _ in 0..=i {
                catalog.add_signature(author, &name);
            }
        }
    }
    catalog
}

fn bench_normalization(c: &mut Criterion) {
    let names = [
        "J. Ellis",
        "Ellis, John R., Jr.",
        "Müller-Lüdenscheidt, Hans",
        "García Márquez, Gabriel José",
    ];

    let mut group = c.benchmark_group("normalization");
    for name in names {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, &n| {
            b.iter(|| DefaultNormalizer.normalize(black_box(n)))
        });
    }
    group.finish();
}

fn bench_qgram_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("qgram_extraction");
    for text in ["ellis, j", "van der berg, johannes maria"] {
        group.bench_with_input(BenchmarkId::from_parameter(text), &text, |b, &t| {
            b.iter(|| extract_qgrams(black_box(t), 2))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let catalog = synthetic_catalog(2_000);

    c.bench_function("build_2k_authors", |b| {
        b.iter(|| {
            let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
            engine.build_index(black_box(&catalog))
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
    engine
        .build_index(&synthetic_catalog(10_000))
        .expect("Failed to build index");

    let mut group = c.benchmark_group("search");
    for query in ["J Ellis", "Ellis, John", "Mueller, Anna", "Zzyx Qqrv", "Smith"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, &q| {
            b.iter(|| engine.find_author_ids(black_box(q)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_normalization,
    bench_qgram_extraction,
    bench_build,
    bench_search,
);

criterion_main!(benches);
