use backend::store::CrimeStore;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn benchmark_text_search(c: &mut Criterion) {
    let store = CrimeStore::sample().expect("sample dataset");

    let mut group = c.benchmark_group("text_search");

    // City-name hit, raw field hit, and the full fallback scan.
    for query in ["mumbai", "Broadway", "atlantis"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, q| {
            b.iter(|| store.search(black_box(q)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_text_search);
criterion_main!(benches);
