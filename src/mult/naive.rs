//! Naive ordered-loop multiplication, the correctness reference.
//!
//! Three nested loops in one of the three distinguishable orders. This is
//! the only strategy that counts floating-point operations exactly: the
//! counter increments by 2 per innermost iteration (one multiply, one add).

use crate::config::LoopOrder;
use crate::matrix::Matrix;

/// Dot-multiplies two square matrices in the given loop order.
///
/// The result matrix must be zeroed by the caller. Returns the exact
/// number of floating-point operations performed.
pub fn multiply_naive(order: LoopOrder, a: &Matrix, b: &Matrix, c: &mut Matrix) -> u64 {
    match order {
        LoopOrder::Ijk => multiply_ijk(a, b, c),
        LoopOrder::Ikj => multiply_ikj(a, b, c),
        LoopOrder::Jki => multiply_jki(a, b, c),
    }
}

/// i → j → k (natural) order: each result cell is finished before the next.
fn multiply_ijk(a: &Matrix, b: &Matrix, c: &mut Matrix) -> u64 {
    let n = a.n();
    let a = a.as_slice();
    let b = b.as_slice();
    let c = c.as_mut_slice();
    let mut flops = 0u64;
    for i in 0..n {
        for j in 0..n {
            // multiply each of the k elements of row i by the corresponding
            // k element of column j, summing into the result cell at (i, j)
            for k in 0..n {
                c[i * n + j] += a[i * n + k] * b[k * n + j];
                flops += 2; // + = 1, * = 1
            }
        }
    }
    flops
}

/// i → k → j order: streams rows of B while one A element stays hot.
fn multiply_ikj(a: &Matrix, b: &Matrix, c: &mut Matrix) -> u64 {
    let n = a.n();
    let a = a.as_slice();
    let b = b.as_slice();
    let c = c.as_mut_slice();
    let mut flops = 0u64;
    for i in 0..n {
        for k in 0..n {
            for j in 0..n {
                c[i * n + j] += a[i * n + k] * b[k * n + j];
                flops += 2;
            }
        }
    }
    flops
}

/// j → k → i order: walks columns of A and C.
fn multiply_jki(a: &Matrix, b: &Matrix, c: &mut Matrix) -> u64 {
    let n = a.n();
    let a = a.as_slice();
    let b = b.as_slice();
    let c = c.as_mut_slice();
    let mut flops = 0u64;
    for j in 0..n {
        for k in 0..n {
            for i in 0..n {
                c[i * n + j] += a[i * n + k] * b[k * n + j];
                flops += 2;
            }
        }
    }
    flops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_flop_count() {
        let n = 6;
        let mut a = Matrix::zeroed(n);
        let mut b = Matrix::zeroed(n);
        let mut c = Matrix::zeroed(n);
        a.fill_random();
        b.fill_random();
        for order in [LoopOrder::Ijk, LoopOrder::Ikj, LoopOrder::Jki] {
            c.zero();
            let flops = multiply_naive(order, &a, &b, &mut c);
            assert_eq!(flops, 2 * (n as u64).pow(3), "order {}", order.name());
        }
    }

    #[test]
    fn test_known_product() {
        // [1 2; 3 4] · [5 6; 7 8] = [19 22; 43 50]
        let mut a = Matrix::zeroed(2);
        let mut b = Matrix::zeroed(2);
        let mut c = Matrix::zeroed(2);
        a.set(0, 0, 1.0);
        a.set(0, 1, 2.0);
        a.set(1, 0, 3.0);
        a.set(1, 1, 4.0);
        b.set(0, 0, 5.0);
        b.set(0, 1, 6.0);
        b.set(1, 0, 7.0);
        b.set(1, 1, 8.0);
        multiply_naive(LoopOrder::Ijk, &a, &b, &mut c);
        assert_eq!(c.row(0), &[19.0, 22.0]);
        assert_eq!(c.row(1), &[43.0, 50.0]);
    }
}
