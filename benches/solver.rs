use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use patternforge::{glob, Solver, SolverConfig};

fn make_items(n: usize, prefix: &str) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}/module{i}/mem/bank{}", i % 8)).collect()
}

fn bench_solve(c: &mut Criterion) {
    let solver = Solver::new(SolverConfig::default()).unwrap();
    let mut group = c.benchmark_group("solve");

    for size in &[10, 100, 500] {
        let include = make_items(*size, "alpha");
        let exclude = make_items(*size, "gamma");
        let include_refs: Vec<&str> = include.iter().map(String::as_str).collect();
        let exclude_refs: Vec<&str> = exclude.iter().map(String::as_str).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| solver.solve(black_box(&include_refs), black_box(&exclude_refs)));
        });
    }
    group.finish();
}

fn bench_glob_matches(c: &mut Criterion) {
    let haystacks: Vec<String> = make_items(1000, "alpha");

    c.bench_function("glob_matches_1000", |b| {
        b.iter(|| {
            for h in &haystacks {
                black_box(glob::matches(black_box("*module*mem*"), h));
            }
        });
    });
}

fn bench_coverage_compute(c: &mut Criterion) {
    use patternforge::candidate::{GenRow, GenerationParams};
    use patternforge::coverage;
    use patternforge::tokenizer;

    let config = SolverConfig::default();
    let include = make_items(200, "alpha");
    let normalized: Vec<String> = include.iter().map(|s| s.to_lowercase()).collect();
    let tokens: Vec<Vec<_>> = include.iter().map(|s| tokenizer::tokenize(s, &config.tokenizer)).collect();
    let rows: Vec<GenRow<'_>> = normalized.iter().zip(tokens.iter()).map(|(n, t)| GenRow { normalized: n.as_str(), tokens: t.as_slice() }).collect();
    let params = GenerationParams {
        allowed_kinds: config.allowed_patterns.clone(),
        min_token_len: config.tokenizer.min_token_len,
        per_word_substrings: config.per_word_substrings,
        max_multi_segments: config.max_multi_segments,
        max_candidates: config.max_candidates,
        field: None,
        field_weight: 1.0,
    };
    let generation = patternforge::candidate::generate(&rows, &params);
    let normalized_refs: Vec<&str> = normalized.iter().map(String::as_str).collect();
    let exclude: Vec<Option<&str>> = vec![];

    c.bench_function("coverage_compute_200x_candidates", |b| {
        b.iter(|| coverage::compute(black_box(&generation.candidates), black_box(&normalized_refs), black_box(&exclude)));
    });
}

criterion_group!(benches, bench_solve, bench_glob_matches, bench_coverage_compute);
criterion_main!(benches);
