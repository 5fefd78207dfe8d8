//! Literal end-to-end scenarios (`spec.md` §8).

use patternforge::{Invert, Mode, Row, Solver, SolverConfig};

fn exact_solver() -> Solver {
    let mut config = SolverConfig::default();
    config.mode = Mode::Exact;
    Solver::new(config).unwrap()
}

#[test]
fn shared_prefix_separates_two_groups() {
    let solver = exact_solver();
    let include = vec!["alpha/module1/mem/i0", "alpha/module2/io/i1", "beta/cache/bank0"];
    let exclude = vec!["gamma/module1/mem/i0", "beta/router/debug"];
    let solution = solver.solve(&include, &exclude).unwrap();

    assert_eq!(solution.metrics.covered, 3);
    assert_eq!(solution.metrics.fp, 0);
    assert_eq!(solution.metrics.fn_, 0);
}

#[test]
fn simple_disjoint_keyword_yields_single_substring_pattern() {
    let solver = exact_solver();
    let include = vec!["a/x/fail", "b/y/fail", "c/z/fail"];
    let exclude = vec!["a/x/pass", "b/y/pass"];
    let solution = solver.solve(&include, &exclude).unwrap();

    assert_eq!(solution.metrics.covered, 3);
    assert_eq!(solution.metrics.fp, 0);
    assert!(solution.patterns.iter().any(|p| p.text == "*fail*"));
}

#[test]
fn unsolvable_exact_instance_returns_empty_success() {
    let solver = exact_solver();
    let include = vec!["x"];
    let exclude = vec!["x"];
    let solution = solver.solve(&include, &exclude).unwrap();

    assert!(solution.patterns.is_empty());
    assert_eq!(solution.metrics.covered, 0);
    assert_eq!(solution.metrics.fp, 0);
    assert_eq!(solution.metrics.fn_, 1);
}

#[test]
fn empty_exclude_single_item_never_emits_bare_wildcard() {
    let solver = exact_solver();
    let include = vec!["chip/cpu/core0"];
    let exclude: Vec<&str> = vec![];
    let solution = solver.solve(&include, &exclude).unwrap();

    assert!(!solution.patterns.is_empty());
    for p in &solution.patterns {
        assert_ne!(p.text, "*");
        assert!(p.text.chars().any(|c| c != '*'));
    }
}

fn row(pairs: &[(&str, Option<&str>)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.map(str::to_string))).collect()
}

#[test]
fn structured_multi_field_reduction() {
    let solver = exact_solver();
    let include = vec![
        row(&[("m", Some("SRAM")), ("i", Some("cpu/l1")), ("p", Some("DIN"))]),
        row(&[("m", Some("SRAM")), ("i", Some("cpu/l1")), ("p", Some("DOUT"))]),
    ];
    let exclude = vec![row(&[("m", Some("SRAM")), ("i", Some("cpu/l1")), ("p", Some("CLK"))])];

    let solution = solver.solve_structured(&include, &exclude).unwrap();
    assert_eq!(solution.metrics.covered, 2);
    assert_eq!(solution.metrics.fp, 0);
}

#[test]
fn structured_null_exclude_field_rejects_matching_include() {
    let solver = exact_solver();
    let include = vec![
        row(&[("i", Some("debug/cpu0")), ("m", Some("SRAM"))]),
        row(&[("i", Some("prod/cpu1")), ("m", Some("SRAM"))]),
    ];
    let exclude = vec![row(&[("i", Some("debug/other")), ("m", None)])];

    let solution = solver.solve_structured(&include, &exclude).unwrap();
    assert_eq!(solution.metrics.fp, 0);
    assert!(solution.metrics.covered <= 2);
}

#[test]
fn solution_round_trips_through_json() {
    let solver = exact_solver();
    let include = vec!["alpha/one", "alpha/two", "beta/three"];
    let exclude = vec!["alpha/shared"];
    let solution = solver.solve(&include, &exclude).unwrap();

    let json = serde_json::to_string(&solution).unwrap();
    let reparsed: patternforge::Solution = serde_json::from_str(&json).unwrap();
    assert_eq!(reparsed.expr, solution.expr);
    assert_eq!(reparsed.metrics.covered, solution.metrics.covered);
}

#[test]
fn inversion_fp_safety_falls_back_to_base_when_complement_has_fp() {
    let mut config = SolverConfig::default();
    config.mode = Mode::Exact;
    config.invert = Invert::Always;
    let solver = Solver::new(config).unwrap();

    let include = vec!["m/i0/d", "m/i1/d", "m/i2/d"];
    let exclude = vec!["m/i3/d", "m/i4/d", "debug/i0/d"];
    let solution = solver.solve(&include, &exclude).unwrap();

    assert_eq!(solution.metrics.fp, 0);
}
