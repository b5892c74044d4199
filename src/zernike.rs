//! Zernike polynomials
//!
//! Zernike polynomials in Noll ordering, normalized to unit variance over the unit disk,
//! as evaluated by the `zernike` crate.
//! The polynomials are evaluated on points normalized by the mirror outer radius
//! and the coefficients are fitted with a least-square solver restricted to the points
//! inside the mirror annulus, the non-orthogonality of the polynomials over the annulus
//! being taken care of by the solver.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Largest number of Zernike terms (radial order up to 14)
pub const MAX_N_TERM: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum ZernikeError {
    #[error("the number of Zernike terms must be in the range [1,{max}], found {n_term}")]
    NTerm { n_term: usize, max: usize },
    #[error("cannot fit {n_term} Zernike terms with {n_point} points")]
    Underdetermined { n_term: usize, n_point: usize },
    #[error("expected {expected} values, found {found}")]
    Shape { expected: usize, found: usize },
    #[error("least-square solver failed: {0}")]
    Solver(&'static str),
}
pub type Result<T> = std::result::Result<T, ZernikeError>;

/// Checks that `n_term` is a supported number of Zernike terms
pub fn check_n_term(n_term: usize) -> Result<usize> {
    if n_term == 0 || n_term > MAX_N_TERM {
        Err(ZernikeError::NTerm {
            n_term,
            max: MAX_N_TERM,
        })
    } else {
        Ok(n_term)
    }
}

/// Number of radial orders spanned by the first `n_term` Zernike polynomials
pub fn n_radial_order(n_term: usize) -> u32 {
    let mut n = 0usize;
    while n * (n + 1) / 2 < n_term {
        n += 1;
    }
    n as u32
}

/// Returns the radial order `n` and the azimuthal frequency `m` of the Noll index `j`
///
/// `j` starts at 1 (piston), `None` for `j=0` or beyond the largest number of terms
pub fn noll_to_nm(j: usize) -> Option<(u32, u32)> {
    if j == 0 || j > MAX_N_TERM {
        return None;
    }
    let (_, n, m) = ::zernike::jnm(n_radial_order(j));
    n.into_iter().zip(m).nth(j - 1)
}

/// Zernike polynomials sampled on a set of points
#[derive(Debug, Clone)]
pub struct ZernikeBasis {
    n_term: usize,
    matrix: DMatrix<f64>,
}
impl ZernikeBasis {
    /// Samples `n_term` Zernike polynomials at the normalized coordinates (`x`,`y`)
    pub fn new(n_term: usize, x: &[f64], y: &[f64]) -> Result<Self> {
        check_n_term(n_term)?;
        if x.len() != y.len() {
            return Err(ZernikeError::Shape {
                expected: x.len(),
                found: y.len(),
            });
        }
        let (j, n, m) = ::zernike::jnm(n_radial_order(n_term));
        let modes: Vec<_> = j
            .into_iter()
            .zip(n)
            .zip(m)
            .map(|((j, n), m)| (j, n, m))
            .take(n_term)
            .collect();
        let rows: Vec<Vec<f64>> = x
            .par_iter()
            .zip(y.par_iter())
            .map(|(x, y)| {
                let (r, o) = (x.hypot(*y), y.atan2(*x));
                modes
                    .iter()
                    .map(|&(j, n, m)| ::zernike::zernike(j, n, m, r, o))
                    .collect()
            })
            .collect();
        Ok(Self {
            n_term,
            matrix: DMatrix::from_row_iterator(x.len(), n_term, rows.into_iter().flatten()),
        })
    }
    #[inline]
    pub fn n_term(&self) -> usize {
        self.n_term
    }
    #[inline]
    pub fn n_point(&self) -> usize {
        self.matrix.nrows()
    }
    /// Returns the basis as a (points x terms) matrix
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
    /// Least-square fit of the Zernike coefficients to the values `z`
    pub fn fit(&self, z: &[f64]) -> Result<Vec<f64>> {
        if z.len() != self.n_point() {
            return Err(ZernikeError::Shape {
                expected: self.n_point(),
                found: z.len(),
            });
        }
        if self.n_point() < self.n_term {
            return Err(ZernikeError::Underdetermined {
                n_term: self.n_term,
                n_point: self.n_point(),
            });
        }
        let b = DVector::from_column_slice(z);
        let c = self
            .matrix
            .clone()
            .svd(true, true)
            .solve(&b, f64::EPSILON)
            .map_err(ZernikeError::Solver)?;
        Ok(c.as_slice().to_vec())
    }
    /// Evaluates the Zernike polynomials weighted by the coefficients `c`
    ///
    /// If there are fewer coefficients than terms, the missing coefficients are set to 0
    pub fn eval(&self, c: &[f64]) -> Result<Vec<f64>> {
        if c.len() > self.n_term {
            return Err(ZernikeError::Shape {
                expected: self.n_term,
                found: c.len(),
            });
        }
        let mut a = DVector::zeros(self.n_term);
        a.rows_mut(0, c.len()).copy_from_slice(c);
        Ok((&self.matrix * a).as_slice().to_vec())
    }
}
