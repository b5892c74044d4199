//!
//! # Mirror surface models
//!
//! A [`MirrorSurface`] is an optical surface over an annulus that holds the current surface
//! map (the surface departure along the optical axis in micron) and fits it with Zernike polynomials.
//! Every mirror surface can be fitted ([`SurfaceFit`]) but only the physical mirror assemblies,
//! [`M1M3`] and [`M2`], can compute their gravity and thermal deformations ([`Deformation`]).
//!
//! # Examples
//!
//! ```
//! use aoclc::{Builder, FromBuilder, MirrorSurface, SurfaceFit, SurfaceMap};
//! let mut mirror = MirrorSurface::builder()
//!     .annulus(0.9, 1.71)
//!     .n_term(3)
//!     .build()?;
//! let x = vec![1., -1.2, 0.3, 1.5, -1.6];
//! let y = vec![0.5, 0.7, -1.4, 0.1, -0.2];
//! let z = x.iter().map(|x| 0.1 * x).collect();
//! mirror.set_surface(SurfaceMap::new(x, y, z)?);
//! let zk = mirror.zernike_fit()?;
//! assert_eq!(zk.len(), 3);
//! # Ok::<(), aoclc::AoclcError>(())
//! ```

use crate::{
    io::{self, IoError},
    lut::LutError,
    phosim::SurfaceType,
    zernike::{ZernikeBasis, ZernikeError},
    FromBuilder,
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

mod builder;
mod m1m3;
mod m2;

pub use builder::{M1M3Builder, M2Builder, MirrorData, MirrorDataBuilder, MirrorSurfaceBuilder};
pub use m1m3::M1M3;
pub use m2::M2;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("invalid mirror configuration: {0}")]
    Configuration(String),
    #[error("the surface of the mirror has not been set")]
    NoSurface,
    #[error("surface map size mismatch, expected {expected} points, found {found}")]
    SurfaceSize { expected: usize, found: usize },
    #[error("expected {expected} bending modes, found {found}")]
    ModeShape { expected: usize, found: usize },
    #[error("mirror surface Zernike fit failed")]
    Zernike(#[from] ZernikeError),
    #[error("cannot read or write mirror data")]
    Data(#[from] IoError),
    #[error("actuator forces failure")]
    Lut(#[from] LutError),
}
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Mirror surface map
///
/// The surface departure `z` (micron) at the grid points (`x`,`y`) (meter)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMap {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}
impl SurfaceMap {
    /// Creates a new surface map
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if y.len() != x.len() || z.len() != x.len() {
            return Err(MirrorError::SurfaceSize {
                expected: x.len(),
                found: if y.len() != x.len() { y.len() } else { z.len() },
            });
        }
        Ok(Self { x, y, z })
    }
    /// Creates a flat surface on the grid (`x`,`y`)
    pub fn flat(x: Vec<f64>, y: Vec<f64>) -> Self {
        let z = vec![0f64; x.len()];
        Self { x, y, z }
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    /// Returns a new surface on the same grid with the departure `z`
    pub fn with_z(&self, z: Vec<f64>) -> Result<Self> {
        Self::new(self.x.clone(), self.y.clone(), z)
    }
    /// Adds `dz` to the surface departure
    pub fn add(&mut self, dz: &[f64]) -> Result<&mut Self> {
        if dz.len() != self.len() {
            return Err(MirrorError::SurfaceSize {
                expected: self.len(),
                found: dz.len(),
            });
        }
        self.z.iter_mut().zip(dz).for_each(|(z, dz)| *z += dz);
        Ok(self)
    }
    /// Returns the points at the given indices
    pub fn select(&self, idx: &[usize]) -> Self {
        Self {
            x: idx.iter().map(|&i| self.x[i]).collect(),
            y: idx.iter().map(|&i| self.y[i]).collect(),
            z: idx.iter().map(|&i| self.z[i]).collect(),
        }
    }
    /// Root mean square of the surface departure
    pub fn rms(&self) -> f64 {
        if self.is_empty() {
            return 0.;
        }
        (self.z.iter().map(|z| z * z).sum::<f64>() / self.len() as f64).sqrt()
    }
}

/// Finite element analysis data of a mirror
///
/// One row per grid point: `x y zdz hdz tzdz trdz`,
/// with (`x`,`y`) in meter and the surface departures in micron for
///  - `zdz`: the mirror pointing at zenith,
///  - `hdz`: the mirror pointing at the horizon,
///  - `tzdz`: a unit vertical temperature gradient,
///  - `trdz`: a unit radial temperature gradient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub zenith: Vec<f64>,
    pub horizon: Vec<f64>,
    pub vertical_gradient: Vec<f64>,
    pub radial_gradient: Vec<f64>,
}
impl TryFrom<&DMatrix<f64>> for FeaData {
    type Error = MirrorError;
    fn try_from(data: &DMatrix<f64>) -> Result<Self> {
        if data.ncols() < 6 {
            return Err(MirrorError::Configuration(format!(
                "FEA table requires 6 columns (x y zdz hdz tzdz trdz), found {}",
                data.ncols()
            )));
        }
        let col = |k: usize| data.column(k).iter().cloned().collect::<Vec<f64>>();
        Ok(Self {
            x: col(0),
            y: col(1),
            zenith: col(2),
            horizon: col(3),
            vertical_gradient: col(4),
            radial_gradient: col(5),
        })
    }
}
impl FeaData {
    /// Loads the FEA table from a text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("loading FEA data {:?}", path.as_ref());
        Self::try_from(&io::load_matrix(path)?)
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    /// Returns a flat surface on the FEA grid
    pub fn grid(&self) -> SurfaceMap {
        SurfaceMap::flat(self.x.clone(), self.y.clone())
    }
    /// Gravity print-through at the zenith angle `zenith_angle` relative to the pre-compensation elevation `precomp_elevation`
    ///
    /// Both angles are in radians
    pub fn print_through(&self, zenith_angle: f64, precomp_elevation: f64) -> Vec<f64> {
        let (s, c) = zenith_angle.sin_cos();
        let (s0, c0) = precomp_elevation.sin_cos();
        self.zenith
            .iter()
            .zip(&self.horizon)
            .map(|(zdz, hdz)| zdz * c + hdz * s - (zdz * c0 + hdz * s0))
            .collect()
    }
    /// Surface departure for the vertical and radial temperature gradients
    pub fn thermal(&self, vertical_gradient: f64, radial_gradient: f64) -> Vec<f64> {
        self.vertical_gradient
            .iter()
            .zip(&self.radial_gradient)
            .map(|(tz, tr)| vertical_gradient * tz + radial_gradient * tr)
            .collect()
    }
}

/// Generic mirror surface
///
/// The surface is fitted with Zernike polynomials over the annulus
/// defined by the inner and outer radius.
#[derive(Debug, Clone)]
pub struct MirrorSurface {
    pub(crate) inner_radius: f64,
    pub(crate) outer_radius: f64,
    pub(crate) n_term: usize,
    pub(crate) lut: Option<crate::lut::ForceTable>,
    pub(crate) surface: Option<SurfaceMap>,
}
impl FromBuilder for MirrorSurface {
    type ComponentBuilder = MirrorSurfaceBuilder;
}
impl Display for MirrorSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mirror [{:.3},{:.3}]m annulus, {} Zernike terms",
            self.inner_radius, self.outer_radius, self.n_term
        )?;
        if let Some(surface) = &self.surface {
            write!(f, ", surface rms: {:.3e}micron", surface.rms())?;
        }
        Ok(())
    }
}
impl MirrorSurface {
    /// Returns the annulus inner radius in meter
    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }
    /// Returns the annulus outer radius in meter
    pub fn outer_radius(&self) -> f64 {
        self.outer_radius
    }
    /// Returns the number of Zernike terms
    pub fn n_term(&self) -> usize {
        self.n_term
    }
    /// Sets the surface departure map in micron
    pub fn set_surface(&mut self, surface: SurfaceMap) -> &mut Self {
        self.surface = Some(surface);
        self
    }
    /// Returns the surface departure map
    pub fn surface(&self) -> Option<&SurfaceMap> {
        self.surface.as_ref()
    }
    /// Checks if the point (`x`,`y`) is inside the annulus
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let r = x.hypot(y);
        r >= self.inner_radius && r <= self.outer_radius
    }
    /// Returns the look-up table actuator forces at the zenith angle `zenith_angle` in degrees
    pub fn lut_force(&self, zenith_angle: f64) -> Result<Vec<f64>> {
        self.lut
            .as_ref()
            .ok_or_else(|| {
                MirrorError::Configuration("the mirror has no force look-up table".into())
            })?
            .lut_force(zenith_angle)
            .map_err(MirrorError::from)
    }
    // the part of the surface inside the annulus and the Zernike basis sampled on it
    fn annulus(&self) -> Result<(SurfaceMap, ZernikeBasis)> {
        let surface = self.surface.as_ref().ok_or(MirrorError::NoSurface)?;
        let idx: Vec<usize> = surface
            .x
            .iter()
            .zip(&surface.y)
            .enumerate()
            .filter(|(_, (x, y))| self.contains(**x, **y))
            .map(|(i, _)| i)
            .collect();
        let annulus = surface.select(&idx);
        let (x, y): (Vec<f64>, Vec<f64>) = annulus
            .x
            .iter()
            .zip(&annulus.y)
            .map(|(x, y)| (x / self.outer_radius, y / self.outer_radius))
            .unzip();
        let basis = ZernikeBasis::new(self.n_term, &x, &y)?;
        Ok((annulus, basis))
    }
}

/// Zernike fit of a mirror surface
pub trait SurfaceFit {
    /// Returns the Zernike coefficients (micron) fitted to the surface inside the annulus
    fn zernike_fit(&self) -> Result<Vec<f64>>;
    /// Returns the surface residual (micron) inside the annulus after removing the fitted Zernike polynomials
    fn grid_residual(&self) -> Result<SurfaceMap>;
    /// Writes the Zernike coefficients and the surface residual into a text file
    ///
    /// The first row holds the Zernike coefficients and each of the following rows holds
    /// the `x y z` coordinates of a residual grid point, all values in millimeter.
    /// Returns the Zernike coefficients in millimeter.
    fn write_surface_result<P: AsRef<Path>>(&self, path: P) -> Result<Vec<f64>> {
        let zk_mm: Vec<f64> = self.zernike_fit()?.into_iter().map(|z| z * 1e-3).collect();
        let residual = self.grid_residual()?;
        let rows = std::iter::once(zk_mm.clone()).chain(
            residual
                .x
                .iter()
                .zip(&residual.y)
                .zip(&residual.z)
                .map(|((x, y), z)| vec![x * 1e3, y * 1e3, z * 1e-3]),
        );
        io::save_rows(path.as_ref(), rows)?;
        log::debug!("surface result written to {:?}", path.as_ref());
        Ok(zk_mm)
    }
}
impl SurfaceFit for MirrorSurface {
    fn zernike_fit(&self) -> Result<Vec<f64>> {
        let (annulus, basis) = self.annulus()?;
        Ok(basis.fit(&annulus.z)?)
    }
    fn grid_residual(&self) -> Result<SurfaceMap> {
        let (annulus, basis) = self.annulus()?;
        let c = basis.fit(&annulus.z)?;
        let fit = basis.eval(&c)?;
        let z = annulus.z.iter().zip(fit).map(|(z, f)| z - f).collect();
        annulus.with_z(z)
    }
}

/// Reads a surface result file
///
/// Returns the Zernike coefficients and the residual map, in millimeter
pub fn read_surface_result<P: AsRef<Path>>(path: P) -> Result<(Vec<f64>, SurfaceMap)> {
    let mut rows = io::load_rows(path.as_ref())?.into_iter();
    let zk = rows.next().ok_or_else(|| {
        MirrorError::Data(IoError::Empty(path.as_ref().to_path_buf()))
    })?;
    let mut map = SurfaceMap::default();
    for row in rows {
        if row.len() != 3 {
            return Err(MirrorError::Data(IoError::Ragged {
                line: map.len() + 2,
                found: row.len(),
                expected: 3,
                path: path.as_ref().to_path_buf(),
            }));
        }
        map.x.push(row[0]);
        map.y.push(row[1]);
        map.z.push(row[2]);
    }
    Ok((zk, map))
}

/// Physical deformations of a mirror assembly
pub trait Deformation {
    /// Gravity print-through (micron) at the zenith angle `zenith_angle` in radians
    fn gravity_deformation(&self, zenith_angle: f64) -> Result<SurfaceMap>;
    /// Surface correction (micron) for the vertical and radial temperature gradients
    fn thermal_correction(&self, vertical_gradient: f64, radial_gradient: f64)
        -> Result<SurfaceMap>;
}

/// Mirror assembly identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MirrorId {
    M1M3,
    M2,
}
impl Display for MirrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorId::M1M3 => write!(f, "M1M3"),
            MirrorId::M2 => write!(f, "M2"),
        }
    }
}

/// Temperature gradients
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalGradient {
    pub vertical: f64,
    pub radial: f64,
}

/// Observing conditions that deform the mirrors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorCondition {
    /// zenith angle in radians
    pub zenith_angle: f64,
    /// ratio of the M1M3 actuator force error in [0,1]
    pub m1m3_force_error: f64,
    /// seed of the actuator force error random generator
    pub seed: u64,
    pub m1m3_temperature: ThermalGradient,
    pub m2_temperature: ThermalGradient,
}
impl Default for MirrorCondition {
    fn default() -> Self {
        Self {
            zenith_angle: 27.0912f64.to_radians(),
            m1m3_temperature: ThermalGradient::default(),
            m2_temperature: ThermalGradient {
                vertical: -0.0675,
                radial: -0.1416,
            },
            m1m3_force_error: 0.05,
            seed: 6,
        }
    }
}
impl MirrorCondition {
    /// Returns the temperature gradients of a mirror
    pub fn temperature(&self, id: MirrorId) -> ThermalGradient {
        match id {
            MirrorId::M1M3 => self.m1m3_temperature,
            MirrorId::M2 => self.m2_temperature,
        }
    }
}

/// Mirror assembly interface
///
/// A mirror assembly is made of one or several optical surfaces sharing the same glass,
/// the same finite element grid and the same bending modes.
pub trait MirrorAssembly: Deformation {
    /// Returns the assembly identifier
    fn id(&self) -> MirrorId;
    /// Returns a flat surface on the assembly grid
    fn grid(&self) -> SurfaceMap;
    /// Returns the bending modes (grid points x modes) if any
    fn modal_basis(&self) -> Option<&DMatrix<f64>>;
    /// Returns the optical surfaces of the assembly
    fn optical_surfaces(&self) -> Vec<(SurfaceType, &MirrorSurface)>;
    /// Sets the surface of the assembly
    fn set_surface(&mut self, surface: SurfaceMap) -> Result<()>;
    /// Surface deformation (micron) under the given observing conditions
    fn condition_surface(&self, condition: &MirrorCondition) -> Result<SurfaceMap> {
        let gradient = condition.temperature(self.id());
        let mut surface = self.gravity_deformation(condition.zenith_angle)?;
        surface.add(
            &self
                .thermal_correction(gradient.vertical, gradient.radial)?
                .z,
        )?;
        Ok(surface)
    }
    /// Surface departure (micron) of the bending modes weighted by `modes` (micron)
    ///
    /// Returns `None` if the assembly has no bending modes
    fn bending_surface(&self, modes: &[f64]) -> Result<Option<Vec<f64>>> {
        match self.modal_basis() {
            Some(basis) if basis.ncols() != modes.len() => Err(MirrorError::ModeShape {
                expected: basis.ncols(),
                found: modes.len(),
            }),
            Some(basis) => Ok(Some(
                (basis * DVector::from_column_slice(modes))
                    .as_slice()
                    .to_vec(),
            )),
            None => Ok(None),
        }
    }
    /// Writes the surface result file of each optical surface into `dir`
    ///
    /// The files are named after the optical surfaces: `M1res.txt`, `M2res.txt`, ...
    /// Returns the optical surface, the file path and the Zernike coefficients in millimeter
    fn write_surface_results<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<Vec<(SurfaceType, PathBuf, Vec<f64>)>> {
        self.optical_surfaces()
            .into_iter()
            .map(|(surface_type, surface)| {
                let path = dir.as_ref().join(format!("{}res.txt", surface_type));
                let zk_mm = surface.write_surface_result(&path)?;
                Ok((surface_type, path, zk_mm))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{zernike, Builder};

    /// A polar grid over the annulus [`ri`,`ro`]
    pub fn polar_grid(ri: f64, ro: f64, n_r: usize, n_o: usize) -> (Vec<f64>, Vec<f64>) {
        (0..n_r)
            .flat_map(|i| {
                let r = ri + (ro - ri) * i as f64 / (n_r - 1) as f64;
                (0..n_o).map(move |j| {
                    let o = 2. * std::f64::consts::PI * j as f64 / n_o as f64;
                    (r * o.cos(), r * o.sin())
                })
            })
            .unzip()
    }

    /// FEA data with analytic print-through and thermal responses
    pub fn fea(ri: f64, ro: f64) -> FeaData {
        let (x, y) = polar_grid(ri, ro, 12, 48);
        let zenith = x.iter().zip(&y).map(|(x, y)| 0.1 * (x * x + y * y)).collect();
        let horizon = y.iter().map(|y| 0.05 * y + 0.01).collect();
        let vertical_gradient = x.iter().map(|x| 0.2 * x).collect();
        let radial_gradient = x.iter().zip(&y).map(|(x, y)| 0.3 * x.hypot(*y)).collect();
        FeaData {
            x,
            y,
            zenith,
            horizon,
            vertical_gradient,
            radial_gradient,
        }
    }

    #[test]
    fn surface_map_size() {
        assert!(SurfaceMap::new(vec![0.; 3], vec![0.; 3], vec![0.; 2]).is_err());
        let mut s = SurfaceMap::flat(vec![0.; 3], vec![0.; 3]);
        assert!(s.add(&[1., 2.]).is_err());
        s.add(&[1., 2., 3.]).unwrap();
        assert_eq!(s.z, vec![1., 2., 3.]);
    }

    #[test]
    fn set_and_get_surface() {
        let mut mirror = MirrorSurface::builder()
            .annulus(0.9, 1.71)
            .n_term(28)
            .build()
            .unwrap();
        assert_eq!(mirror.inner_radius(), 0.9);
        assert_eq!(mirror.outer_radius(), 1.71);
        assert_eq!(mirror.n_term(), 28);
        assert!(mirror.surface().is_none());
        assert!(matches!(mirror.zernike_fit(), Err(MirrorError::NoSurface)));
        let s = SurfaceMap::new(vec![1., 2.], vec![0.5, 0.], vec![0.25, -1.]).unwrap();
        mirror.set_surface(s.clone());
        assert_eq!(mirror.surface(), Some(&s));
    }

    #[test]
    fn bad_n_term() {
        assert!(matches!(
            MirrorSurface::builder().n_term(0).build(),
            Err(crate::AoclcError::Mirror(MirrorError::Configuration(_)))
        ));
        assert!(MirrorSurface::builder()
            .n_term(zernike::MAX_N_TERM + 1)
            .build()
            .is_err());
    }

    #[test]
    fn zernike_round_trip() {
        let (ri, ro) = (0.9, 1.71);
        let mut mirror = MirrorSurface::builder()
            .annulus(ri, ro)
            .n_term(28)
            .build()
            .unwrap();
        let (x, y) = polar_grid(ri, ro, 15, 64);
        let (xn, yn): (Vec<f64>, Vec<f64>) = x.iter().zip(&y).map(|(x, y)| (x / ro, y / ro)).unzip();
        let basis = ZernikeBasis::new(28, &xn, &yn).unwrap();
        let c0: Vec<f64> = (0..28).map(|j| ((j * 7 % 11) as f64 - 5.) * 0.1).collect();
        let z = basis.eval(&c0).unwrap();
        mirror.set_surface(SurfaceMap::new(x, y, z).unwrap());
        let c = mirror.zernike_fit().unwrap();
        let residual = mirror.grid_residual().unwrap();
        let err: f64 = c0.iter().zip(&c).map(|(a, b)| (a - b).abs()).sum();
        assert!(err < 1e-9, "{err}");
        assert!(residual.z.iter().map(|x| x.abs()).sum::<f64>() < 1e-9);
    }

    #[test]
    fn points_outside_annulus_are_excluded() {
        let (ri, ro) = (0.9, 1.71);
        let mut mirror = MirrorSurface::builder()
            .annulus(ri, ro)
            .n_term(3)
            .build()
            .unwrap();
        let (mut x, mut y) = polar_grid(ri, ro, 5, 16);
        let n = x.len();
        let mut z: Vec<f64> = x.iter().map(|x| 0.5 * x).collect();
        // a large bump at the center of the annulus
        x.push(0.1);
        y.push(0.);
        z.push(1e3);
        mirror.set_surface(SurfaceMap::new(x, y, z).unwrap());
        let residual = mirror.grid_residual().unwrap();
        assert_eq!(residual.len(), n);
        assert!(residual.rms() < 1e-9);
    }

    #[test]
    fn surface_result_file() -> anyhow::Result<()> {
        let (ri, ro) = (0.9, 1.71);
        let mut mirror = MirrorSurface::builder()
            .annulus(ri, ro)
            .n_term(6)
            .build()?;
        let (x, y) = polar_grid(ri, ro, 8, 32);
        let z: Vec<f64> = x.iter().zip(&y).map(|(x, y)| x * y + 0.01 * x.powi(3)).collect();
        mirror.set_surface(SurfaceMap::new(x, y, z)?);
        let path = std::env::temp_dir().join("aoclc_surface_result_file.txt");
        let zk_mm = mirror.write_surface_result(&path)?;
        let (zk, map) = read_surface_result(&path)?;
        assert_eq!(zk.len(), 6);
        zk.iter()
            .zip(&zk_mm)
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-15));
        let residual = mirror.grid_residual()?;
        assert_eq!(map.len(), residual.len());
        map.z
            .iter()
            .zip(&residual.z)
            .for_each(|(a, b)| assert!((a - b * 1e-3).abs() < 1e-15));
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn print_through_reference() {
        let fea = fea(0.9, 1.71);
        assert!(fea.print_through(0., 0.).iter().all(|z| *z == 0.));
        let p = fea.print_through(0.3, 0.3);
        assert!(p.iter().all(|z| z.abs() < 1e-15));
        let p = fea.print_through(std::f64::consts::FRAC_PI_2, 0.);
        p.iter()
            .zip(fea.zenith.iter().zip(&fea.horizon))
            .for_each(|(p, (z, h))| assert!((p - (h - z)).abs() < 1e-12));
    }
}
