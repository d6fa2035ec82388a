//! Matrix CSV files and the quote-aware field tokenizer.
//!
//! Matrix data files carry one row per line, comma-separated decimal cells
//! and no header row. Cells are written with 3 decimal places, so a write
//! followed by a read reproduces every cell to 0.0005 absolute.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::error::{io_error, Result};
use crate::matrix::Matrix;

/// Splits one CSV line into fields.
///
/// Fields may be double-quoted; inside a quoted field a doubled quote
/// stands for a literal quote and commas lose their delimiter meaning.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(ch),
            }
        }
    }
    fields.push(field);
    fields
}

/// Reads a square matrix from a CSV file into `matrix`.
///
/// A line with fewer than 2 fields is treated as a trailing blank line and
/// stops reading; more than N rows are ignored with a warning; a field count
/// other than N is a fatal read error. Returns the number of rows stored.
pub fn read_matrix(path: &Path, matrix: &mut Matrix) -> Result<usize> {
    let n = matrix.n();
    let file = File::open(path)
        .map_err(|e| io_error(path.display().to_string(), format!("cannot read the input file: {e}")))?;

    let mut rows = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line
            .map_err(|e| io_error(path.display().to_string(), format!("read failed: {e}")))?;
        let fields = split_fields(&line);
        if fields.len() < 2 {
            warn!("found short trailing line, will stop reading rows now: {line:?}");
            break;
        }
        if fields.len() != n {
            return Err(io_error(
                path.display().to_string(),
                format!(
                    "{} values found on a line, the file must contain a square matrix of size {}",
                    fields.len(),
                    n
                ),
            ));
        }
        if rows >= n {
            warn!("more than {n} rows in file, ignoring rows after the first {n}");
            continue;
        }
        for (j, cell) in fields.iter().enumerate() {
            let value = cell.trim().parse::<f64>().map_err(|_| {
                io_error(
                    path.display().to_string(),
                    format!("cell ({rows}, {j}) is not a number: {cell:?}"),
                )
            })?;
            matrix.set(rows, j, value);
        }
        rows += 1;
    }
    Ok(rows)
}

/// Writes a matrix to a CSV file, silently overwriting an existing file.
///
/// Cells are printed with 3 decimal places and no whitespace.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        io_error(path.display().to_string(), format!("cannot write to the output file: {e}"))
    })?;
    let mut out = BufWriter::new(file);

    let n = matrix.n();
    for i in 0..n {
        for j in 0..n {
            if j > 0 {
                write!(out, ",{:.3}", matrix.at(i, j))
            } else {
                write!(out, "{:.3}", matrix.at(i, j))
            }
            .map_err(|e| io_error(path.display().to_string(), format!("write failed: {e}")))?;
        }
        writeln!(out)
            .map_err(|e| io_error(path.display().to_string(), format!("write failed: {e}")))?;
    }
    out.flush()
        .map_err(|e| io_error(path.display().to_string(), format!("write failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_fields() {
        assert_eq!(split_fields("1.0,2.5,-3"), vec!["1.0", "2.5", "-3"]);
    }

    #[test]
    fn test_split_quoted_fields() {
        assert_eq!(
            split_fields(r#""a,b",plain,"say ""hi""""#),
            vec!["a,b", "plain", r#"say "hi""#]
        );
    }

    #[test]
    fn test_split_empty_line_is_single_field() {
        assert_eq!(split_fields(""), vec![""]);
    }

    #[test]
    fn test_split_keeps_empty_cells() {
        assert_eq!(split_fields("1,,3"), vec!["1", "", "3"]);
    }
}
