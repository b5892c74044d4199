use super::{FeaData, MirrorError, MirrorSurface, M1M3, M2};
use crate::{
    io,
    lut::{ActuatorForceCorrector, ForceTable},
    zernike, Builder, Result,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// [`MirrorSurface`] builder
///
/// Default properties:
///  - annulus      : [0,1]m
///  - Zernike terms: 28
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorSurfaceBuilder {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub n_term: usize,
    #[serde(skip)]
    lut: Option<ForceTable>,
}
impl Default for MirrorSurfaceBuilder {
    fn default() -> Self {
        Self {
            inner_radius: 0.,
            outer_radius: 1.,
            n_term: 28,
            lut: None,
        }
    }
}
impl MirrorSurfaceBuilder {
    /// Sets the inner and outer radius of the mirror annulus in meter
    pub fn annulus(self, inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            inner_radius,
            outer_radius,
            ..self
        }
    }
    /// Sets the number of Zernike terms
    pub fn n_term(self, n_term: usize) -> Self {
        Self { n_term, ..self }
    }
    /// Sets the actuator force look-up table
    pub fn lut(self, lut: ForceTable) -> Self {
        Self {
            lut: Some(lut),
            ..self
        }
    }
    pub(crate) fn validate(&self) -> std::result::Result<(), MirrorError> {
        zernike::check_n_term(self.n_term)
            .map_err(|e| MirrorError::Configuration(e.to_string()))?;
        if !(self.inner_radius >= 0. && self.inner_radius < self.outer_radius) {
            return Err(MirrorError::Configuration(format!(
                "invalid annulus [{},{}]m",
                self.inner_radius, self.outer_radius
            )));
        }
        Ok(())
    }
    pub(crate) fn surface(self) -> std::result::Result<MirrorSurface, MirrorError> {
        self.validate()?;
        Ok(MirrorSurface {
            inner_radius: self.inner_radius,
            outer_radius: self.outer_radius,
            n_term: self.n_term,
            lut: self.lut,
            surface: None,
        })
    }
}
impl Builder for MirrorSurfaceBuilder {
    type Component = MirrorSurface;
    fn build(self) -> Result<MirrorSurface> {
        Ok(self.surface()?)
    }
}

/// Mirror assembly data files
///
/// The data can also be given in memory, the in-memory data taking precedence over the files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorData {
    /// FEA table: `x y zdz hdz tzdz trdz`
    pub fea: Option<PathBuf>,
    /// actuator force look-up table
    pub force_table: Option<PathBuf>,
    /// actuator influence matrix (grid points x actuators)
    pub influence: Option<PathBuf>,
    /// bending modes (grid points x modes)
    pub modal_basis: Option<PathBuf>,
    #[serde(skip)]
    fea_data: Option<FeaData>,
    #[serde(skip)]
    force_table_data: Option<ForceTable>,
    #[serde(skip)]
    influence_data: Option<DMatrix<f64>>,
    #[serde(skip)]
    modal_basis_data: Option<DMatrix<f64>>,
}
impl MirrorData {
    pub(crate) fn load_fea(&self) -> std::result::Result<FeaData, MirrorError> {
        match (&self.fea_data, &self.fea) {
            (Some(data), _) => Ok(data.clone()),
            (None, Some(path)) => FeaData::load(path),
            (None, None) => Err(MirrorError::Configuration(
                "the mirror FEA data is missing".into(),
            )),
        }
    }
    pub(crate) fn load_force_table(&self) -> std::result::Result<Option<ForceTable>, MirrorError> {
        match (&self.force_table_data, &self.force_table) {
            (Some(data), _) => Ok(Some(data.clone())),
            (None, Some(path)) => Ok(Some(ForceTable::load(path)?)),
            (None, None) => Ok(None),
        }
    }
    fn load_matrix(
        data: &Option<DMatrix<f64>>,
        path: &Option<PathBuf>,
        n_point: usize,
        name: &str,
    ) -> std::result::Result<Option<DMatrix<f64>>, MirrorError> {
        let matrix = match (data, path) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => io::load_matrix(path)?,
            (None, None) => return Ok(None),
        };
        if matrix.nrows() != n_point {
            return Err(MirrorError::Configuration(format!(
                "the {} has {} rows, expected {} (FEA grid)",
                name,
                matrix.nrows(),
                n_point
            )));
        }
        Ok(Some(matrix))
    }
    pub(crate) fn load_modal_basis(
        &self,
        n_point: usize,
    ) -> std::result::Result<Option<DMatrix<f64>>, MirrorError> {
        Self::load_matrix(
            &self.modal_basis_data,
            &self.modal_basis,
            n_point,
            "modal basis",
        )
    }
    pub(crate) fn load_actuators(
        &self,
        n_point: usize,
    ) -> std::result::Result<Option<ActuatorForceCorrector>, MirrorError> {
        let Some(table) = self.load_force_table()? else {
            return Ok(None);
        };
        let corrector = ActuatorForceCorrector::from(table);
        match Self::load_matrix(
            &self.influence_data,
            &self.influence,
            n_point,
            "influence matrix",
        )? {
            Some(influence) => Ok(Some(corrector.influence(influence)?)),
            None => Ok(Some(corrector)),
        }
    }
}

/// Mirror data setters shared by the mirror assembly builders
pub trait MirrorDataBuilder: Sized {
    fn data(&mut self) -> &mut MirrorData;
    /// Sets the path to the FEA table
    fn fea<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data().fea = Some(path.into());
        self
    }
    /// Sets the FEA data
    fn fea_data(mut self, data: FeaData) -> Self {
        self.data().fea_data = Some(data);
        self
    }
    /// Sets the path to the actuator force look-up table
    fn force_table<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data().force_table = Some(path.into());
        self
    }
    /// Sets the actuator force look-up table
    fn force_table_data(mut self, data: ForceTable) -> Self {
        self.data().force_table_data = Some(data);
        self
    }
    /// Sets the path to the actuator influence matrix
    fn influence<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data().influence = Some(path.into());
        self
    }
    /// Sets the actuator influence matrix
    fn influence_data(mut self, data: DMatrix<f64>) -> Self {
        self.data().influence_data = Some(data);
        self
    }
    /// Sets the path to the bending modes
    fn modal_basis<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data().modal_basis = Some(path.into());
        self
    }
    /// Sets the bending modes
    fn modal_basis_data(mut self, data: DMatrix<f64>) -> Self {
        self.data().modal_basis_data = Some(data);
        self
    }
}

/// [`M2`] builder
///
/// Default properties:
///  - annulus          : [0.9,1.71]m
///  - Zernike terms    : 28
///  - pre-compensation : 0 (zenith)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M2Builder {
    /// pre-compensated elevation in radians
    pub precomp_elevation: f64,
    pub surface: MirrorSurfaceBuilder,
    pub data: MirrorData,
}
impl Default for M2Builder {
    fn default() -> Self {
        Self {
            surface: MirrorSurfaceBuilder::default().annulus(0.9, 1.71),
            data: MirrorData::default(),
            precomp_elevation: 0.,
        }
    }
}
impl MirrorDataBuilder for M2Builder {
    fn data(&mut self) -> &mut MirrorData {
        &mut self.data
    }
}
impl M2Builder {
    /// Sets the inner and outer radius of the mirror annulus in meter
    pub fn annulus(self, inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            surface: self.surface.annulus(inner_radius, outer_radius),
            ..self
        }
    }
    /// Sets the number of Zernike terms
    pub fn n_term(self, n_term: usize) -> Self {
        Self {
            surface: self.surface.n_term(n_term),
            ..self
        }
    }
    /// Sets the pre-compensated elevation in radians
    pub fn precomp_elevation(self, precomp_elevation: f64) -> Self {
        Self {
            precomp_elevation,
            ..self
        }
    }
}
impl Builder for M2Builder {
    type Component = M2;
    fn build(self) -> Result<M2> {
        let fea = self.data.load_fea()?;
        let modal_basis = self.data.load_modal_basis(fea.len())?;
        let actuators = self.data.load_actuators(fea.len())?;
        let lut = actuators.as_ref().map(|a| a.table().clone());
        let surface = match lut {
            Some(lut) => self.surface.lut(lut),
            None => self.surface,
        }
        .surface()?;
        log::info!("M2: {} ({} FEA grid points)", surface, fea.len());
        Ok(M2 {
            surface,
            fea,
            modal_basis,
            actuators,
            precomp_elevation: self.precomp_elevation,
        })
    }
}

/// [`M1M3`] builder
///
/// Default properties:
///  - M1 annulus       : [2.558,4.18]m
///  - M3 annulus       : [0.55,2.508]m
///  - Zernike terms    : 28
///  - pre-compensation : 0 (zenith)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M1M3Builder {
    /// pre-compensated elevation in radians
    pub precomp_elevation: f64,
    /// number of actuators acting along the optical axis,
    /// the last one is used to balance the force errors along the optical axis
    pub n_z_actuator: Option<usize>,
    pub m1: MirrorSurfaceBuilder,
    pub m3: MirrorSurfaceBuilder,
    pub data: MirrorData,
}
impl Default for M1M3Builder {
    fn default() -> Self {
        Self {
            m1: MirrorSurfaceBuilder::default().annulus(2.558, 4.18),
            m3: MirrorSurfaceBuilder::default().annulus(0.55, 2.508),
            data: MirrorData::default(),
            precomp_elevation: 0.,
            n_z_actuator: None,
        }
    }
}
impl MirrorDataBuilder for M1M3Builder {
    fn data(&mut self) -> &mut MirrorData {
        &mut self.data
    }
}
impl M1M3Builder {
    /// Sets the inner and outer radius of the M1 annulus in meter
    pub fn m1_annulus(self, inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            m1: self.m1.annulus(inner_radius, outer_radius),
            ..self
        }
    }
    /// Sets the inner and outer radius of the M3 annulus in meter
    pub fn m3_annulus(self, inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            m3: self.m3.annulus(inner_radius, outer_radius),
            ..self
        }
    }
    /// Sets the number of Zernike terms of both M1 and M3
    pub fn n_term(self, n_term: usize) -> Self {
        Self {
            m1: self.m1.n_term(n_term),
            m3: self.m3.n_term(n_term),
            ..self
        }
    }
    /// Sets the pre-compensated elevation in radians
    pub fn precomp_elevation(self, precomp_elevation: f64) -> Self {
        Self {
            precomp_elevation,
            ..self
        }
    }
    /// Sets the number of actuators acting along the optical axis
    pub fn n_z_actuator(self, n_z_actuator: usize) -> Self {
        Self {
            n_z_actuator: Some(n_z_actuator),
            ..self
        }
    }
}
impl Builder for M1M3Builder {
    type Component = M1M3;
    fn build(self) -> Result<M1M3> {
        let fea = self.data.load_fea()?;
        let modal_basis = self.data.load_modal_basis(fea.len())?;
        let actuators = self.data.load_actuators(fea.len())?;
        if let (Some(actuators), Some(n_z)) = (&actuators, self.n_z_actuator) {
            if n_z == 0 || n_z > actuators.n_actuator() {
                return Err(MirrorError::Configuration(format!(
                    "invalid number of z actuators: {}, the look-up table has {} actuators",
                    n_z,
                    actuators.n_actuator()
                ))
                .into());
            }
        }
        let (m1, m3) = match actuators.as_ref().map(|a| a.table().clone()) {
            Some(lut) => (self.m1.lut(lut.clone()), self.m3.lut(lut)),
            None => (self.m1, self.m3),
        };
        let (m1, m3) = (m1.surface()?, m3.surface()?);
        log::info!("M1: {}", m1);
        log::info!("M3: {} ({} FEA grid points)", m3, fea.len());
        Ok(M1M3 {
            m1,
            m3,
            fea,
            modal_basis,
            actuators,
            precomp_elevation: self.precomp_elevation,
            n_z_actuator: self.n_z_actuator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FromBuilder;

    #[test]
    fn m2_defaults() {
        let builder = M2::builder();
        assert_eq!(builder.surface.inner_radius, 0.9);
        assert_eq!(builder.surface.outer_radius, 1.71);
        assert_eq!(builder.surface.n_term, 28);
    }

    #[test]
    fn missing_fea() {
        assert!(matches!(
            M2::builder().build(),
            Err(crate::AoclcError::Mirror(MirrorError::Configuration(_)))
        ));
    }

    #[test]
    fn bad_annulus() {
        let fea = crate::mirror::tests::fea(0.9, 1.71);
        assert!(M2::builder()
            .fea_data(fea.clone())
            .annulus(1.71, 0.9)
            .build()
            .is_err());
        assert!(M2::builder()
            .fea_data(fea)
            .annulus(-0.1, 0.9)
            .build()
            .is_err());
    }

    #[test]
    fn modal_basis_rows() {
        let fea = crate::mirror::tests::fea(0.9, 1.71);
        let n = fea.len();
        assert!(M2::builder()
            .fea_data(fea.clone())
            .modal_basis_data(DMatrix::zeros(n + 1, 3))
            .build()
            .is_err());
        assert!(M2::builder()
            .fea_data(fea)
            .modal_basis_data(DMatrix::zeros(n, 3))
            .build()
            .is_ok());
    }

    #[test]
    fn toml_paths() -> anyhow::Result<()> {
        let builder = M1M3::builder()
            .fea("data/M1M3/M1M3_1um_156_grid.txt")
            .force_table("data/M1M3/M1M3_LUT.txt")
            .n_z_actuator(156);
        let toml = toml::to_string_pretty(&builder)?;
        let other: M1M3Builder = toml::from_str(&toml)?;
        assert_eq!(builder, other);
        Ok(())
    }
}
