use super::{
    Deformation, FeaData, MirrorAssembly, MirrorId, MirrorSurface, Result, SurfaceFit, SurfaceMap,
};
use crate::{lut::ActuatorForceCorrector, phosim::SurfaceType, FromBuilder};
use nalgebra::DMatrix;
use std::ops::Deref;

/// Secondary mirror
///
/// M2 is a single optical surface which surface departure comes from
/// the gravity print-through, the thermal gradients and the bending modes.
#[derive(Debug, Clone)]
pub struct M2 {
    pub(crate) surface: MirrorSurface,
    pub(crate) fea: FeaData,
    pub(crate) modal_basis: Option<DMatrix<f64>>,
    pub(crate) actuators: Option<ActuatorForceCorrector>,
    pub(crate) precomp_elevation: f64,
}
impl FromBuilder for M2 {
    type ComponentBuilder = super::M2Builder;
}
impl Deref for M2 {
    type Target = MirrorSurface;
    fn deref(&self) -> &Self::Target {
        &self.surface
    }
}
impl M2 {
    /// Returns the FEA data
    pub fn fea(&self) -> &FeaData {
        &self.fea
    }
    /// Returns the actuator force corrector if any
    pub fn actuators(&self) -> Option<&ActuatorForceCorrector> {
        self.actuators.as_ref()
    }
    /// Returns the pre-compensated elevation in radians
    pub fn precomp_elevation(&self) -> f64 {
        self.precomp_elevation
    }
}
impl Deformation for M2 {
    fn gravity_deformation(&self, zenith_angle: f64) -> Result<SurfaceMap> {
        self.fea
            .grid()
            .with_z(self.fea.print_through(zenith_angle, self.precomp_elevation))
    }
    fn thermal_correction(&self, vertical_gradient: f64, radial_gradient: f64) -> Result<SurfaceMap> {
        self.fea
            .grid()
            .with_z(self.fea.thermal(vertical_gradient, radial_gradient))
    }
}
impl SurfaceFit for M2 {
    fn zernike_fit(&self) -> Result<Vec<f64>> {
        self.surface.zernike_fit()
    }
    fn grid_residual(&self) -> Result<SurfaceMap> {
        self.surface.grid_residual()
    }
}
impl MirrorAssembly for M2 {
    fn id(&self) -> MirrorId {
        MirrorId::M2
    }
    fn grid(&self) -> SurfaceMap {
        self.fea.grid()
    }
    fn modal_basis(&self) -> Option<&DMatrix<f64>> {
        self.modal_basis.as_ref()
    }
    fn optical_surfaces(&self) -> Vec<(SurfaceType, &MirrorSurface)> {
        vec![(SurfaceType::M2, &self.surface)]
    }
    fn set_surface(&mut self, surface: SurfaceMap) -> Result<()> {
        if surface.len() != self.fea.len() {
            return Err(super::MirrorError::SurfaceSize {
                expected: self.fea.len(),
                found: surface.len(),
            });
        }
        self.surface.set_surface(surface);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mirror::{tests::fea, MirrorCondition, MirrorDataBuilder, ThermalGradient},
        Builder,
    };

    fn m2() -> M2 {
        M2::builder().fea_data(fea(0.9, 1.71)).build().unwrap()
    }

    #[test]
    fn gravity_at_zenith_is_null() {
        let m2 = m2();
        let s = m2.gravity_deformation(0.).unwrap();
        assert_eq!(s.len(), m2.fea().len());
        assert!(s.z.iter().all(|z| *z == 0.));
    }

    #[test]
    fn gravity_is_deterministic() {
        let m2 = m2();
        let z = 27.0912f64.to_radians();
        assert_eq!(
            m2.gravity_deformation(z).unwrap(),
            m2.gravity_deformation(z).unwrap()
        );
    }

    #[test]
    fn thermal_is_linear() {
        let m2 = m2();
        let a = m2.thermal_correction(-0.0675, 0.).unwrap();
        let b = m2.thermal_correction(0., -0.1416).unwrap();
        let c = m2.thermal_correction(-0.0675, -0.1416).unwrap();
        c.z.iter()
            .zip(a.z.iter().zip(&b.z))
            .for_each(|(c, (a, b))| assert!((c - a - b).abs() < 1e-15));
        assert!(m2.thermal_correction(0., 0.).unwrap().rms() == 0.);
    }

    #[test]
    fn condition_surface() {
        let m2 = m2();
        let condition = MirrorCondition {
            m2_temperature: ThermalGradient {
                vertical: 1.,
                radial: 0.,
            },
            zenith_angle: 0.,
            ..Default::default()
        };
        let s = m2.condition_surface(&condition).unwrap();
        s.z.iter()
            .zip(&m2.fea().vertical_gradient)
            .for_each(|(s, t)| assert!((s - t).abs() < 1e-15));
    }

    #[test]
    fn set_surface_and_fit() {
        let mut m2 = m2();
        let s = m2.gravity_deformation(0.5).unwrap();
        assert!(m2.set_surface(SurfaceMap::default()).is_err());
        m2.set_surface(s).unwrap();
        let zk = m2.zernike_fit().unwrap();
        assert_eq!(zk.len(), 28);
        assert!(m2.grid_residual().unwrap().rms() < 1e-9);
    }

    #[test]
    fn bending_surface() {
        let fea = fea(0.9, 1.71);
        let n = fea.len();
        let basis = DMatrix::from_fn(n, 2, |i, j| (i * (j + 1)) as f64);
        let m2 = M2::builder()
            .fea_data(fea)
            .modal_basis_data(basis)
            .build()
            .unwrap();
        let z = m2.bending_surface(&[1., 0.5]).unwrap().unwrap();
        assert_eq!(z[3], 3. + 0.5 * 6.);
        assert!(m2.bending_surface(&[1.]).is_err());
    }
}
