//! Min/max optimisation and value enumeration.

mod common;

use common::{byte, word, zero_seed_solver};

use fuzzbv::ast::Expr;
use fuzzbv::state::ValueVerdict;

#[test]
fn maximize_respects_the_path_constraint() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::ult(byte(0), Expr::constant(10, 8));
    let expr = byte(0);

    let (value, proof) = solver.maximize(&pi, &expr).unwrap();
    assert_eq!(value, 9);
    assert_eq!(proof[0], 9);
}

#[test]
fn maximize_unconstrained_byte_saturates() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::bool_const(true);

    let (value, proof) = solver.maximize(&pi, &byte(3)).unwrap();
    assert_eq!(value, 0xff);
    assert_eq!(proof[3], 0xff);
}

#[test]
fn minimize_from_a_nonzero_seed() {
    use fuzzbv::solver::Solver;
    use fuzzbv::testcase::Testcase;

    let seed = Testcase::from_bytes(&[50, 0, 0, 0, 0, 0, 0, 0]);
    let mut solver = Solver::with_config(
        common::TreeEvaluator,
        seed,
        vec![],
        0,
        fuzzbv::config::Config::default(),
    )
    .with_rng_seed(3);

    // The seed satisfies the path constraint; nothing below 4 does.
    let pi = Expr::ugt(byte(0), Expr::constant(3, 8));
    let (value, proof) = solver.minimize(&pi, &byte(0)).unwrap();
    assert_eq!(value, 4);
    assert_eq!(proof[0], 4);
}

#[test]
fn maximize_a_two_byte_word() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::ult(word(0, 2), Expr::constant(0x1234, 16));

    let (value, _) = solver.maximize(&pi, &word(0, 2)).unwrap();
    assert_eq!(value, 0x1233);
}

#[test]
fn greedy_variant_agrees_on_small_domains() {
    let mut config = fuzzbv::config::Config::default();
    config.use_greedy_mamin = true;
    let mut solver = common::solver_with_config(8, config);

    let pi = Expr::ult(byte(0), Expr::constant(10, 8));
    let (value, _) = solver.maximize(&pi, &byte(0)).unwrap();
    assert_eq!(value, 9);
}

#[test]
fn find_all_values_enumerates_a_known_interval() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::ult(byte(0), Expr::constant(5, 8));
    solver.notify_constraint(&pi);

    let mut seen = vec![];
    solver
        .find_all_values(&byte(0), &pi, |proof, value| {
            assert_eq!(proof[0] as u64, value);
            seen.push(value);
            ValueVerdict::Continue
        })
        .unwrap();

    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn find_all_values_stops_on_request() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::bool_const(true);

    let mut calls = 0;
    solver
        .find_all_values(&byte(0), &pi, |_, _| {
            calls += 1;
            if calls == 3 {
                ValueVerdict::Stop
            } else {
                ValueVerdict::Continue
            }
        })
        .unwrap();

    assert_eq!(calls, 3);
}

#[test]
fn find_all_values_reports_distinct_values_once() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::bool_const(true);
    // Two bytes fold into one value; duplicates must collapse.
    let expr = Expr::bvand(vec![byte(0), Expr::constant(0x01, 8)]);

    let mut seen = vec![];
    solver
        .find_all_values(&expr, &pi, |_, value| {
            seen.push(value);
            ValueVerdict::Continue
        })
        .unwrap();

    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen, vec![0, 1]);

    let mut raw = vec![];
    solver
        .find_all_values(&expr, &pi, |_, value| {
            raw.push(value);
            ValueVerdict::Continue
        })
        .unwrap();
    let len_before = raw.len();
    raw.dedup();
    assert_eq!(raw.len(), len_before, "each distinct value reported once");
}

#[test]
fn find_all_values_last_keeps_exploring_silently() {
    let mut solver = zero_seed_solver(8);
    let pi = Expr::bool_const(true);

    let mut reported = 0;
    solver
        .find_all_values(&byte(0), &pi, |_, _| {
            reported += 1;
            if reported == 2 {
                ValueVerdict::Last
            } else {
                ValueVerdict::Continue
            }
        })
        .unwrap();

    assert_eq!(reported, 2);
}
