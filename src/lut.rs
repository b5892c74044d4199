//! Actuator force look-up table
//!
//! The look-up table (LUT) gives the actuator forces that compensate the gravity
//! at a set of reference zenith angles.
//! The first row of the table is the ruler of zenith angles (in degrees) and each
//! following row holds the forces of one actuator, one column per reference angle.

use crate::io::{self, IoError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LutError {
    #[error("zenith angle {angle}deg is outside the look-up table range [{min},{max}]deg")]
    Range { angle: f64, min: f64, max: f64 },
    #[error("the look-up table requires a ruler row, 1 actuator row and 2 angles at least, found {0}x{1}")]
    Table(usize, usize),
    #[error("the look-up table ruler must be strictly increasing")]
    Ruler,
    #[error("size mismatch, expected {expected} values, found {found}")]
    Shape { expected: usize, found: usize },
    #[error("cannot load the look-up table")]
    Data(#[from] IoError),
    #[error("influence matrix pseudo-inverse failed: {0}")]
    PseudoInverse(&'static str),
}
pub type Result<T> = std::result::Result<T, LutError>;

/// Actuator force look-up table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceTable {
    ruler: Vec<f64>,
    // actuators x angles
    forces: DMatrix<f64>,
}
impl ForceTable {
    /// Creates a new table from a matrix which first row is the zenith angle ruler
    pub fn new(table: DMatrix<f64>) -> Result<Self> {
        let (nrows, ncols) = table.shape();
        if nrows < 2 || ncols < 2 {
            return Err(LutError::Table(nrows, ncols));
        }
        let ruler: Vec<f64> = table.row(0).iter().cloned().collect();
        if ruler.windows(2).any(|w| w[1] <= w[0]) {
            return Err(LutError::Ruler);
        }
        let forces = table.rows(1, nrows - 1).into_owned();
        Ok(Self { ruler, forces })
    }
    /// Loads the table from a text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("loading force look-up table {:?}", path.as_ref());
        Self::new(io::load_matrix(path)?)
    }
    /// Returns the zenith angle ruler in degrees
    pub fn ruler(&self) -> &[f64] {
        &self.ruler
    }
    /// Returns the number of actuators
    #[inline]
    pub fn n_actuator(&self) -> usize {
        self.forces.nrows()
    }
    fn column(&self, k: usize) -> DVector<f64> {
        self.forces.column(k).into_owned()
    }
    /// Returns the actuator forces at the zenith angle `zenith_angle` in degrees
    ///
    /// The forces are linearly interpolated between the two reference angles that bracket
    /// the zenith angle.
    /// If the zenith angle falls exactly on an inner reference angle of the ruler,
    /// the forces are the mean of the 2 columns on either side of that reference angle.
    /// On the first and last reference angles, the forces are the column of the reference angle.
    pub fn lut_force(&self, zenith_angle: f64) -> Result<Vec<f64>> {
        let n = self.ruler.len();
        let (min, max) = (self.ruler[0], self.ruler[n - 1]);
        if !(min..=max).contains(&zenith_angle) {
            return Err(LutError::Range {
                angle: zenith_angle,
                min,
                max,
            });
        }
        let force = match self.ruler.iter().position(|&a| a == zenith_angle) {
            Some(k) if k == 0 || k == n - 1 => self.column(k),
            Some(k) => (self.column(k - 1) + self.column(k + 1)) * 0.5,
            None => {
                let p2 = self
                    .ruler
                    .iter()
                    .position(|&a| a > zenith_angle)
                    .unwrap_or(n - 1);
                let p1 = p2 - 1;
                let step = self.ruler[p2] - self.ruler[p1];
                let w1 = (self.ruler[p2] - zenith_angle) / step;
                let w2 = (zenith_angle - self.ruler[p1]) / step;
                self.column(p1) * w1 + self.column(p2) * w2
            }
        };
        Ok(force.as_slice().to_vec())
    }
}

/// Actuator force corrector
///
/// Interpolates the force look-up table and converts surface errors into actuator forces
/// with the actuator influence matrix.
/// The influence matrix gives the surface displacement at each grid point for a unit force
/// on each actuator (grid points x actuators).
#[derive(Debug, Clone)]
pub struct ActuatorForceCorrector {
    table: ForceTable,
    influence: Option<DMatrix<f64>>,
}
impl From<ForceTable> for ActuatorForceCorrector {
    fn from(table: ForceTable) -> Self {
        Self {
            table,
            influence: None,
        }
    }
}
impl ActuatorForceCorrector {
    /// Sets the actuator influence matrix
    pub fn influence(mut self, influence: DMatrix<f64>) -> Result<Self> {
        if influence.ncols() != self.table.n_actuator() {
            return Err(LutError::Shape {
                expected: self.table.n_actuator(),
                found: influence.ncols(),
            });
        }
        self.influence = Some(influence);
        Ok(self)
    }
    pub fn table(&self) -> &ForceTable {
        &self.table
    }
    pub fn n_actuator(&self) -> usize {
        self.table.n_actuator()
    }
    /// Returns the influence matrix
    pub fn influence_matrix(&self) -> Option<&DMatrix<f64>> {
        self.influence.as_ref()
    }
    /// Returns the look-up table forces at the zenith angle `zenith_angle` in degrees
    pub fn lut_force(&self, zenith_angle: f64) -> Result<Vec<f64>> {
        self.table.lut_force(zenith_angle)
    }
    fn influence_or_err(&self) -> Result<&DMatrix<f64>> {
        self.influence.as_ref().ok_or(LutError::Shape {
            expected: self.table.n_actuator(),
            found: 0,
        })
    }
    /// Returns the surface deformation for the given actuator forces
    pub fn surface(&self, forces: &[f64]) -> Result<Vec<f64>> {
        let influence = self.influence_or_err()?;
        if forces.len() != influence.ncols() {
            return Err(LutError::Shape {
                expected: influence.ncols(),
                found: forces.len(),
            });
        }
        Ok((influence * DVector::from_column_slice(forces))
            .as_slice()
            .to_vec())
    }
    /// Returns the actuator forces that cancel the residual surface error in the least-square sense
    pub fn force_correction(&self, residual: &[f64]) -> Result<Vec<f64>> {
        let influence = self.influence_or_err()?;
        if residual.len() != influence.nrows() {
            return Err(LutError::Shape {
                expected: influence.nrows(),
                found: residual.len(),
            });
        }
        let pinv = influence
            .clone()
            .pseudo_inverse(1e-12)
            .map_err(LutError::PseudoInverse)?;
        Ok((pinv * DVector::from_column_slice(residual) * -1.)
            .as_slice()
            .to_vec())
    }
}
