//! Numerical equivalence of the multiplication strategy family.

use matmark::config::{LoopOrder, Strategy};
use matmark::matrix::Matrix;
use matmark::metrics::{FlopCount, TestOutcome};
use matmark::mult::multiply;
use matmark::validate::{equal_columns, equal_rows};
use ndarray::Array2;

const EPS: f64 = 1e-9;

fn random_operands(n: usize) -> (Matrix, Matrix) {
    let mut a = Matrix::zeroed(n);
    let mut b = Matrix::zeroed(n);
    a.fill_random();
    b.fill_random();
    (a, b)
}

fn assert_close(actual: &Matrix, expected: &Matrix, what: &str) {
    for i in 0..actual.n() {
        for j in 0..actual.n() {
            let x = actual.at(i, j);
            let y = expected.at(i, j);
            assert!(
                (x - y).abs() < EPS,
                "{what}: cell ({i}, {j}) mismatch: {x} != {y}"
            );
        }
    }
}

#[test]
fn test_all_loop_orders_agree() {
    let n = 16;
    let (a, b) = random_operands(n);

    let mut reference = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &a, &b, &mut reference).unwrap();

    for order in [LoopOrder::Ikj, LoopOrder::Jki] {
        let mut c = Matrix::zeroed(n);
        let flops = multiply(Strategy::Naive, order, 0, &a, &b, &mut c).unwrap();
        assert_close(&c, &reference, order.name());
        assert_eq!(flops, FlopCount::Counted(2 * (n as u64).pow(3)));
    }
}

#[test]
fn test_optimized_strategies_match_naive() {
    let n = 24;
    let (a, b) = random_operands(n);

    let mut reference = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &a, &b, &mut reference).unwrap();

    for strategy in [Strategy::Blocked, Strategy::Parallel, Strategy::Simd] {
        for block_size in [2, 4, 6, 12, 24] {
            let mut c = Matrix::zeroed(n);
            let flops = multiply(strategy, LoopOrder::Ijk, block_size, &a, &b, &mut c).unwrap();
            assert_close(
                &c,
                &reference,
                &format!("{} with block size {block_size}", strategy.name()),
            );
            assert_eq!(
                flops,
                FlopCount::NotMeasured,
                "{} must not count flops",
                strategy.name()
            );
        }
    }
}

#[test]
fn test_non_dividing_block_size_fails_without_work() {
    let n = 10;
    let (a, b) = random_operands(n);

    for strategy in [Strategy::Blocked, Strategy::Parallel, Strategy::Simd] {
        for block_size in [3, 4, 7] {
            let mut c = Matrix::zeroed(n);
            let result = multiply(strategy, LoopOrder::Ijk, block_size, &a, &b, &mut c);
            assert!(
                result.is_err(),
                "{} must reject block size {block_size} for N = {n}",
                strategy.name()
            );
            assert!(
                c.as_slice().iter().all(|&x| x == 0.0),
                "no multiplication may be attempted after the error"
            );
        }
    }
}

#[test]
fn test_identity_multiplication_preserves_a() {
    let n = 8;
    let (a, _) = random_operands(n);
    let mut identity = Matrix::zeroed(n);
    identity.fill_identity();

    for (strategy, block_size) in [
        (Strategy::Naive, 0),
        (Strategy::Blocked, 4),
        (Strategy::Parallel, 4),
        (Strategy::Simd, 4),
    ] {
        let mut c = Matrix::zeroed(n);
        multiply(strategy, LoopOrder::Ijk, block_size, &a, &identity, &mut c).unwrap();
        assert_close(&c, &a, strategy.name());
    }
}

#[test]
fn test_ones_matrix_invariants() {
    let n = 12;
    let (a, _) = random_operands(n);
    let mut ones = Matrix::zeroed(n);
    ones.fill_constant(1.0);

    // A · J gives every row a constant value, so all columns agree.
    let mut c = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &a, &ones, &mut c).unwrap();
    assert_eq!(equal_columns(&c), TestOutcome::Passed);

    // J · A gives every column a constant value, so all rows agree.
    let mut c = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &ones, &a, &mut c).unwrap();
    assert_eq!(equal_rows(&c), TestOutcome::Passed);
}

#[test]
fn test_concrete_4x4_scenario() {
    let n = 4;
    let mut a = Matrix::zeroed(n);
    for i in 0..n {
        for j in 0..n {
            a.set(i, j, (i * n + j + 1) as f64);
        }
    }

    // B = identity: the result equals A exactly.
    let mut identity = Matrix::zeroed(n);
    identity.fill_identity();
    let mut c = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &a, &identity, &mut c).unwrap();
    for i in 0..n {
        for j in 0..n {
            assert_eq!(c.at(i, j), a.at(i, j), "identity cell ({i}, {j})");
        }
    }

    // B = ones: row i of the result holds the sum of row i of A.
    let mut ones = Matrix::zeroed(n);
    ones.fill_constant(1.0);
    let mut c = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ijk, 0, &a, &ones, &mut c).unwrap();
    let expected_rows = [10.0, 26.0, 42.0, 58.0];
    for (i, expected) in expected_rows.iter().enumerate() {
        for j in 0..n {
            assert_eq!(c.at(i, j), *expected, "ones cell ({i}, {j})");
        }
    }
    assert_eq!(equal_columns(&c), TestOutcome::Passed);
}

#[test]
fn test_naive_matches_ndarray_dot() {
    let n = 16;
    let (a, b) = random_operands(n);

    let nd_a = Array2::from_shape_vec((n, n), a.as_slice().to_vec()).unwrap();
    let nd_b = Array2::from_shape_vec((n, n), b.as_slice().to_vec()).unwrap();
    let expected = nd_a.dot(&nd_b);

    let mut c = Matrix::zeroed(n);
    multiply(Strategy::Naive, LoopOrder::Ikj, 0, &a, &b, &mut c).unwrap();
    for i in 0..n {
        for j in 0..n {
            assert!(
                (c.at(i, j) - expected[[i, j]]).abs() < EPS,
                "ndarray cross-check failed at ({i}, {j})"
            );
        }
    }
}
