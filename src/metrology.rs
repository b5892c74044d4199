//!
//! # OPD metrology
//!
//! Field points where the optical path difference (OPD) is computed, with their
//! Gaussian quadrature (GQ) weights, and the image quality metrics derived from the OPD:
//! the normalized point source sensitivity (PSSN) and the effective FWHM.

use crate::io::{self, IoError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum MetrologyError {
    #[error("no wavefront error for sensor {0}")]
    MissingSensor(String),
    #[error("expected {expected} field values, found {found}")]
    Shape { expected: usize, found: usize },
    #[error("the PSSN file {0} must have a PSSN row and a FWHM row")]
    PssnFile(std::path::PathBuf),
    #[error("metrology data file failure")]
    Data(#[from] IoError),
}
pub type Result<T> = std::result::Result<T, MetrologyError>;

/// ComCam sensor names
pub const COMCAM_SENSORS: [&str; 9] = [
    "R22_S00", "R22_S01", "R22_S02", "R22_S10", "R22_S11", "R22_S12", "R22_S20", "R22_S21",
    "R22_S22",
];
/// ComCam field points separation in degrees
pub const COMCAM_FIELD_STEP: f64 = 0.2347;

/// Effective FWHM in arcsec from the PSSN
///
/// `FWHM_eff = 1.086 * 0.6 * sqrt(1/PSSN - 1)`
pub fn fwhm_eff(pssn: f64) -> f64 {
    1.086 * 0.6 * (1. / pssn - 1.).sqrt()
}

/// OPD field points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpdMetrology {
    /// field x coordinates in degrees
    pub field_x: Vec<f64>,
    /// field y coordinates in degrees
    pub field_y: Vec<f64>,
    /// GQ weights
    pub weights: Vec<f64>,
    /// OPD wavelength in nm
    pub wavelength: f64,
}
impl Default for OpdMetrology {
    fn default() -> Self {
        Self::comcam()
    }
}
impl OpdMetrology {
    /// The 9 field points at the center of the ComCam sensors, with uniform weights
    ///
    /// The field points follow the order of [`COMCAM_SENSORS`]
    pub fn comcam() -> Self {
        let steps = [-COMCAM_FIELD_STEP, 0., COMCAM_FIELD_STEP];
        let (field_x, field_y): (Vec<f64>, Vec<f64>) = steps
            .iter()
            .flat_map(|y| steps.iter().map(move |x| (*x, *y)))
            .unzip();
        let n = field_x.len();
        Self {
            field_x,
            field_y,
            weights: vec![1. / n as f64; n],
            wavelength: 500.,
        }
    }
    /// Sets the OPD wavelength in nm
    pub fn wavelength(self, wavelength: f64) -> Self {
        Self { wavelength, ..self }
    }
    /// Adds a field point with weight `weight`
    pub fn add_field(&mut self, x: f64, y: f64, weight: f64) -> &mut Self {
        self.field_x.push(x);
        self.field_y.push(y);
        self.weights.push(weight);
        self
    }
    #[inline]
    pub fn n_field(&self) -> usize {
        self.field_x.len()
    }
    /// Returns the field points as (x,y) pairs in degrees
    pub fn fields(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.field_x.iter().cloned().zip(self.field_y.iter().cloned())
    }
    /// GQ weighted value
    ///
    /// The weights are normalized to sum to 1
    pub fn gq_value(&self, values: &[f64]) -> Result<f64> {
        if values.len() != self.n_field() {
            return Err(MetrologyError::Shape {
                expected: self.n_field(),
                found: values.len(),
            });
        }
        let w: f64 = self.weights.iter().sum();
        Ok(values
            .iter()
            .zip(&self.weights)
            .map(|(v, w)| v * w)
            .sum::<f64>()
            / w)
    }
    /// Computes the PSSN summary from the PSSN of each field point
    pub fn pssn_summary(&self, pssn: Vec<f64>) -> Result<PssnSummary> {
        let fwhm: Vec<f64> = pssn.iter().map(|p| fwhm_eff(*p)).collect();
        Ok(PssnSummary {
            gq_pssn: self.gq_value(&pssn)?,
            gq_fwhm: self.gq_value(&fwhm)?,
            pssn,
            fwhm,
        })
    }
}

/// PSSN and effective FWHM of the field points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PssnSummary {
    pub pssn: Vec<f64>,
    /// effective FWHM in arcsec
    pub fwhm: Vec<f64>,
    pub gq_pssn: f64,
    pub gq_fwhm: f64,
}
impl PssnSummary {
    /// Writes the summary into a text file
    ///
    /// Row 0 is the PSSN of each field point followed by the GQ PSSN,
    /// row 1 is the effective FWHM of each field point followed by the GQ effective FWHM
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let pssn: Vec<f64> = self.pssn.iter().cloned().chain([self.gq_pssn]).collect();
        let fwhm: Vec<f64> = self.fwhm.iter().cloned().chain([self.gq_fwhm]).collect();
        io::save_rows(path, [pssn, fwhm])?;
        Ok(())
    }
    /// Reads the summary from a text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rows = io::load_rows(path.as_ref())?;
        match rows.as_slice() {
            [pssn, fwhm, ..] if pssn.len() > 1 && pssn.len() == fwhm.len() => {
                let n = pssn.len() - 1;
                Ok(Self {
                    pssn: pssn[..n].to_vec(),
                    fwhm: fwhm[..n].to_vec(),
                    gq_pssn: pssn[n],
                    gq_fwhm: fwhm[n],
                })
            }
            _ => Err(MetrologyError::PssnFile(path.as_ref().to_path_buf())),
        }
    }
    /// Pairs the effective FWHM with the sensor names
    pub fn sensor_fwhm(&self, sensors: &[&str]) -> Result<Vec<SensorFwhm>> {
        if sensors.len() != self.fwhm.len() {
            return Err(MetrologyError::Shape {
                expected: self.fwhm.len(),
                found: sensors.len(),
            });
        }
        Ok(sensors
            .iter()
            .zip(&self.fwhm)
            .map(|(sensor, fwhm)| SensorFwhm {
                sensor: sensor.to_string(),
                fwhm: *fwhm,
            })
            .collect())
    }
}

/// Effective FWHM of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFwhm {
    pub sensor: String,
    /// arcsec
    pub fwhm: f64,
}

/// Wavefront error of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorWavefrontError {
    pub sensor: String,
    /// Zernike coefficients in micron
    pub zk: Vec<f64>,
}
impl SensorWavefrontError {
    pub fn new(sensor: &str, zk: Vec<f64>) -> Self {
        Self {
            sensor: sensor.into(),
            zk,
        }
    }
}

/// Orders the wavefront errors as the sensors
pub fn reorder_wavefront_errors<'a>(
    errors: &'a [SensorWavefrontError],
    sensors: &[&str],
) -> Result<Vec<&'a SensorWavefrontError>> {
    sensors
        .iter()
        .map(|sensor| {
            errors
                .iter()
                .find(|e| e.sensor == *sensor)
                .ok_or_else(|| MetrologyError::MissingSensor(sensor.to_string()))
        })
        .collect()
}

/// Writes the wavefront errors, one sensor per row, in the order of the sensors
pub fn save_wavefront_errors<P: AsRef<Path>>(
    path: P,
    errors: &[SensorWavefrontError],
    sensors: &[&str],
) -> Result<()> {
    let ordered = reorder_wavefront_errors(errors, sensors)?;
    io::save_rows(path, ordered.into_iter().map(|e| e.zk.as_slice()))?;
    Ok(())
}

/// Writes the OPD Zernike coefficients, one field point per row
pub fn save_zernikes<P: AsRef<Path>>(path: P, zk: &[Vec<f64>]) -> Result<()> {
    io::save_rows(path, zk)?;
    Ok(())
}

/// Reads a Zernike coefficients file
pub fn load_zernikes<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    Ok(io::load_rows(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comcam_fields() {
        let metr = OpdMetrology::comcam();
        assert_eq!(metr.n_field(), COMCAM_SENSORS.len());
        assert_eq!(metr.fields().nth(4), Some((0., 0.)));
        assert_eq!(metr.fields().next(), Some((-0.2347, -0.2347)));
        assert!((metr.weights.iter().sum::<f64>() - 1.).abs() < 1e-12);
    }

    #[test]
    fn effective_fwhm() {
        assert_eq!(fwhm_eff(1.), 0.);
        assert!((fwhm_eff(0.5) - 0.6516).abs() < 1e-12);
    }

    #[test]
    fn gq_value() {
        let mut metr = OpdMetrology::comcam();
        assert!((metr.gq_value(&[2.; 9]).unwrap() - 2.).abs() < 1e-12);
        assert!(metr.gq_value(&[2.; 8]).is_err());
        metr.add_field(1., 1., 1.);
        let mut values = vec![0.; 10];
        values[9] = 4.;
        assert!((metr.gq_value(&values).unwrap() - 2.).abs() < 1e-12);
    }

    #[test]
    fn pssn_file() -> anyhow::Result<()> {
        let metr = OpdMetrology::comcam();
        let pssn: Vec<f64> = (0..9).map(|i| 0.9 + 0.01 * i as f64).collect();
        let summary = metr.pssn_summary(pssn)?;
        let path = std::env::temp_dir().join("aoclc_metrology_pssn.txt");
        summary.save(&path)?;
        let other = PssnSummary::load(&path)?;
        assert_eq!(summary, other);
        let fwhm = other.sensor_fwhm(&COMCAM_SENSORS)?;
        assert_eq!(fwhm[4].sensor, "R22_S11");
        assert_eq!(fwhm[4].fwhm, fwhm_eff(other.pssn[4]));
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn reorder() {
        let errors: Vec<_> = COMCAM_SENSORS
            .iter()
            .rev()
            .enumerate()
            .map(|(i, s)| SensorWavefrontError::new(s, vec![i as f64]))
            .collect();
        let ordered = reorder_wavefront_errors(&errors, &COMCAM_SENSORS).unwrap();
        assert_eq!(ordered[0].sensor, "R22_S00");
        assert_eq!(ordered[0].zk, vec![8.]);
        assert!(matches!(
            reorder_wavefront_errors(&errors[1..], &COMCAM_SENSORS),
            Err(MetrologyError::MissingSensor(_))
        ));
    }
}
