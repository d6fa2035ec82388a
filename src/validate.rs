//! Result validators.
//!
//! Each check compares with a fixed absolute tolerance and a signed
//! difference: a cell only fails when it exceeds its partner by more than
//! [`FAILURE_THRESHOLD`]. Within a row the scan stops at the first failing
//! pair, but every other row is still checked. Validation outcomes are data
//! for the metrics record, never errors.

use std::path::Path;

use log::{info, warn};

use crate::csv;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::metrics::TestOutcome;
use crate::FAILURE_THRESHOLD;

/// Checks that every row holds identical values across its columns.
///
/// Holds for C = A · J where J is the all-ones matrix.
pub fn equal_columns(matrix: &Matrix) -> TestOutcome {
    let n = matrix.n();
    let mut result = TestOutcome::Passed;
    for i in 0..n {
        // Start at column 1 so each cell compares with its left neighbour.
        for j in 1..n {
            let diff = matrix.at(i, j) - matrix.at(i, j - 1);
            if diff > FAILURE_THRESHOLD {
                warn!(
                    "Test failure: result[{i}][{j}] {} does not match result[{i}][{}]: {} (diff: {diff})",
                    matrix.at(i, j),
                    j - 1,
                    matrix.at(i, j - 1),
                );
                result = TestOutcome::Failed;
                break; // give up on this row, but check the remaining rows
            }
        }
    }
    match result {
        TestOutcome::Passed => info!("Successful test of matching columns"),
        _ => info!("Failed! Columns do not match"),
    }
    result
}

/// Checks that every column holds identical values down its rows.
///
/// Holds for C = J · A where J is the all-ones matrix.
pub fn equal_rows(matrix: &Matrix) -> TestOutcome {
    let n = matrix.n();
    let mut result = TestOutcome::Passed;
    // Start at row 1 so each cell compares with the row above.
    for i in 1..n {
        for j in 0..n {
            let diff = matrix.at(i, j) - matrix.at(i - 1, j);
            if diff > FAILURE_THRESHOLD {
                warn!(
                    "Test failure: result[{i}][{j}] {} does not match result[{}][{j}]: {} (diff: {diff})",
                    matrix.at(i, j),
                    i - 1,
                    matrix.at(i - 1, j),
                );
                result = TestOutcome::Failed;
                break;
            }
        }
    }
    match result {
        TestOutcome::Passed => info!("Successful test of matching rows"),
        _ => info!("Failed! Rows do not match"),
    }
    result
}

/// Compares the produced matrix cell-by-cell against a reference file.
///
/// Trailing extra rows in the reference file are ignored, but a reference
/// with fewer rows than the matrix dimension fails the comparison outright.
/// I/O problems reading the reference are fatal, not validation failures.
pub fn compare_with_reference(path: &Path, matrix: &Matrix) -> Result<TestOutcome> {
    let n = matrix.n();
    let mut expected = Matrix::zeroed(n);
    let rows = csv::read_matrix(path, &mut expected)?;
    if rows < n {
        warn!(
            "Test failed: the reference matrix has {rows} rows whereas the produced matrix has {n}"
        );
        return Ok(TestOutcome::Failed);
    }

    let mut result = TestOutcome::Passed;
    for i in 0..n {
        for j in 0..n {
            let diff = matrix.at(i, j) - expected.at(i, j);
            if diff > FAILURE_THRESHOLD {
                warn!(
                    "Test failure: result[{i}][{j}] {} does not match expected: {} (diff: {diff})",
                    matrix.at(i, j),
                    expected.at(i, j),
                );
                result = TestOutcome::Failed;
                break;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from_rows(rows: &[&[f64]]) -> Matrix {
        let n = rows.len();
        let mut m = Matrix::zeroed(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                m.set(i, j, value);
            }
        }
        m
    }

    #[test]
    fn test_equal_columns_passes() {
        let m = matrix_from_rows(&[&[10.0, 10.0, 10.0], &[26.0, 26.0, 26.0], &[5.0, 5.0, 5.0]]);
        assert_eq!(equal_columns(&m), TestOutcome::Passed);
    }

    #[test]
    fn test_equal_columns_fails_on_jump() {
        let m = matrix_from_rows(&[&[1.0, 1.0, 1.0], &[2.0, 2.5, 2.0], &[3.0, 3.0, 3.0]]);
        assert_eq!(equal_columns(&m), TestOutcome::Failed);
    }

    #[test]
    fn test_equal_columns_signed_tolerance() {
        // A column that drops is within the signed tolerance; only a rise
        // beyond the threshold trips the check.
        let falling = matrix_from_rows(&[&[2.0, 1.0], &[2.0, 1.0]]);
        assert_eq!(equal_columns(&falling), TestOutcome::Passed);
        let rising = matrix_from_rows(&[&[1.0, 2.0], &[1.0, 1.0]]);
        assert_eq!(equal_columns(&rising), TestOutcome::Failed);
    }

    #[test]
    fn test_equal_rows_passes() {
        let m = matrix_from_rows(&[&[7.0, 8.0, 9.0], &[7.0, 8.0, 9.0], &[7.0, 8.0, 9.0]]);
        assert_eq!(equal_rows(&m), TestOutcome::Passed);
    }

    #[test]
    fn test_equal_rows_fails() {
        let m = matrix_from_rows(&[&[7.0, 8.0], &[7.0, 8.5]]);
        assert_eq!(equal_rows(&m), TestOutcome::Failed);
    }

    #[test]
    fn test_within_epsilon_passes() {
        let m = matrix_from_rows(&[&[1.0, 1.0005], &[1.0, 1.0]]);
        assert_eq!(equal_columns(&m), TestOutcome::Passed);
    }
}
