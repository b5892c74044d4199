//! Delimited text tables
//!
//! The mirror data tables, the surface result files and the DOF files are plain text
//! matrices, one row per line, with values separated by white spaces or commas.
//! Lines starting with `#` are comments.
//! Values are written with the `%.18e` format of `numpy.savetxt`.

use nalgebra::DMatrix;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("cannot open data file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create data file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot write data file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("invalid number {value:?} at line {line} of {path}")]
    Parse {
        value: String,
        line: usize,
        path: PathBuf,
    },
    #[error("line {line} of {path} has {found} columns, expected {expected}")]
    Ragged {
        line: usize,
        found: usize,
        expected: usize,
        path: PathBuf,
    },
    #[error("data file {0} is empty")]
    Empty(PathBuf),
}
pub type Result<T> = std::result::Result<T, IoError>;

/// Formats a number like `numpy.savetxt` default format (`%.18e`)
///
/// The exponent is signed and has at least 2 digits: `1.000000000000000000e+03`
pub fn format_e18(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0. { "inf".into() } else { "-inf".into() };
    }
    let s = format!("{:.18e}", x);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let e: i32 = exp.parse().unwrap_or_default();
            format!(
                "{}e{}{:02}",
                mantissa,
                if e < 0 { '-' } else { '+' },
                e.abs()
            )
        }
        None => s,
    }
}

/// Parses rows of numbers, rows may have different lengths
pub fn parse_rows(text: &str, path: &Path) -> Result<Vec<Vec<f64>>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(i, line)| {
            line.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|v| !v.is_empty())
                .map(|v| {
                    v.parse::<f64>().map_err(|_| IoError::Parse {
                        value: v.to_string(),
                        line: i,
                        path: path.to_path_buf(),
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

/// Loads rows of numbers from a text file
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).map_err(|e| IoError::Open(e, path.to_path_buf()))?;
    parse_rows(&text, path)
}

/// Loads a matrix from a text file
///
/// All the rows must have the same number of columns
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<DMatrix<f64>> {
    let path = path.as_ref();
    let rows = load_rows(path)?;
    into_matrix(rows, path)
}

pub(crate) fn into_matrix(rows: Vec<Vec<f64>>, path: &Path) -> Result<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows
        .first()
        .map(|r| r.len())
        .ok_or_else(|| IoError::Empty(path.to_path_buf()))?;
    if let Some((line, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(IoError::Ragged {
            line: line + 1,
            found: row.len(),
            expected: ncols,
            path: path.to_path_buf(),
        });
    }
    Ok(DMatrix::from_row_iterator(
        nrows,
        ncols,
        rows.into_iter().flatten(),
    ))
}

/// Writes rows of numbers into a text file, one row per line
pub fn save_rows<P, I, R>(path: P, rows: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = R>,
    R: AsRef<[f64]>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| IoError::Create(e, path.to_path_buf()))?;
    let mut buffer = BufWriter::new(file);
    for row in rows {
        let line = row
            .as_ref()
            .iter()
            .map(|x| format_e18(*x))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(buffer, "{}", line).map_err(|e| IoError::Write(e, path.to_path_buf()))?;
    }
    buffer
        .flush()
        .map_err(|e| IoError::Write(e, path.to_path_buf()))
}

/// Writes a matrix into a text file
pub fn save_matrix<P: AsRef<Path>>(path: P, matrix: &DMatrix<f64>) -> Result<()> {
    save_rows(
        path,
        matrix
            .row_iter()
            .map(|r| r.iter().cloned().collect::<Vec<f64>>()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numpy_format() {
        assert_eq!(format_e18(1000.), "1.000000000000000000e+03");
        assert_eq!(format_e18(-2.5e-5), "-2.500000000000000000e-05");
        assert_eq!(format_e18(0.), "0.000000000000000000e+00");
        assert_eq!(format_e18(1.5e123), "1.500000000000000000e+123");
    }

    #[test]
    fn parse_mixed_delimiters() {
        let rows = parse_rows("# x y\n1 2,3\n\n 4\t5 6 \n", Path::new("mem")).unwrap();
        assert_eq!(rows, vec![vec![1., 2., 3.], vec![4., 5., 6.]]);
    }

    #[test]
    fn parse_error_reports_line() {
        let err = parse_rows("1 2\n3 x\n", Path::new("mem")).unwrap_err();
        assert!(matches!(err, IoError::Parse { line: 2, .. }));
    }

    #[test]
    fn ragged_matrix() {
        let rows = parse_rows("1 2\n3\n", Path::new("mem")).unwrap();
        let err = into_matrix(rows, Path::new("mem")).unwrap_err();
        assert!(matches!(
            err,
            IoError::Ragged {
                line: 2,
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn matrix_file() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("aoclc_io_matrix_file.txt");
        let m = DMatrix::from_row_slice(2, 3, &[1., -2., 3e-7, 4., 5., 6e9]);
        save_matrix(&path, &m)?;
        let n = load_matrix(&path)?;
        assert_eq!(m, n);
        fs::remove_file(path)?;
        Ok(())
    }
}
