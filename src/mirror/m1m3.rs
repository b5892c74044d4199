use super::{
    Deformation, FeaData, MirrorAssembly, MirrorCondition, MirrorError, MirrorId, MirrorSurface,
    Result, SurfaceMap,
};
use crate::{lut::ActuatorForceCorrector, phosim::SurfaceType, zernike::ZernikeBasis, FromBuilder};
use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Primary-tertiary mirror
///
/// M1 and M3 are 2 optical surfaces polished on the same glass,
/// they share the FEA grid, the actuators and the bending modes.
/// The M1M3 gravity print-through is computed with piston, tip and tilt removed
/// as they are compensated by the mirror hexapod.
#[derive(Debug, Clone)]
pub struct M1M3 {
    pub(crate) m1: MirrorSurface,
    pub(crate) m3: MirrorSurface,
    pub(crate) fea: FeaData,
    pub(crate) modal_basis: Option<DMatrix<f64>>,
    pub(crate) actuators: Option<ActuatorForceCorrector>,
    pub(crate) precomp_elevation: f64,
    pub(crate) n_z_actuator: Option<usize>,
}
impl FromBuilder for M1M3 {
    type ComponentBuilder = super::M1M3Builder;
}
impl M1M3 {
    /// Returns the M1 surface
    pub fn m1(&self) -> &MirrorSurface {
        &self.m1
    }
    /// Returns the M3 surface
    pub fn m3(&self) -> &MirrorSurface {
        &self.m3
    }
    pub fn fea(&self) -> &FeaData {
        &self.fea
    }
    pub fn actuators(&self) -> Option<&ActuatorForceCorrector> {
        self.actuators.as_ref()
    }
    /// Removes piston, tip and tilt over the whole glass
    fn remove_ptt(&self, z: &[f64]) -> Result<Vec<f64>> {
        let r = self.m1.outer_radius;
        let (x, y): (Vec<f64>, Vec<f64>) = self
            .fea
            .x
            .iter()
            .zip(&self.fea.y)
            .map(|(x, y)| (x / r, y / r))
            .unzip();
        let basis = ZernikeBasis::new(3, &x, &y)?;
        let c = basis.fit(z)?;
        Ok(z.iter()
            .zip(basis.eval(&c)?)
            .map(|(z, ptt)| z - ptt)
            .collect())
    }
    /// Surface error (micron) of random actuator force errors
    ///
    /// The actuator forces are drawn uniformly within ±`ratio` of the look-up table
    /// forces at the zenith angle `zenith_angle` (radians).
    /// The net force errors along the optical axis and along the y axis are balanced
    /// by the last actuator of each axis.
    /// The same `seed` gives the same surface.
    pub fn force_error_surface(
        &self,
        zenith_angle: f64,
        ratio: f64,
        seed: u64,
    ) -> Result<SurfaceMap> {
        let actuators = self.actuators.as_ref().ok_or_else(|| {
            MirrorError::Configuration("M1M3 has no actuator force look-up table".into())
        })?;
        let lut = actuators.lut_force(zenith_angle.to_degrees())?;
        let n = lut.len();
        let n_z = self.n_z_actuator.unwrap_or(n);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut force: Vec<f64> = lut
            .iter()
            .map(|f| (1. + 2. * (rng.gen::<f64>() - 0.5) * ratio) * f)
            .collect();
        // z force balance
        let dz: f64 = force[..n_z - 1]
            .iter()
            .zip(&lut[..n_z - 1])
            .map(|(f, l)| f - l)
            .sum();
        force[n_z - 1] = lut[n_z - 1] - dz;
        // y force balance
        if n_z < n {
            let dy: f64 = force[n_z..n - 1]
                .iter()
                .zip(&lut[n_z..n - 1])
                .map(|(f, l)| f - l)
                .sum();
            force[n - 1] = lut[n - 1] - dy;
        }
        let error: Vec<f64> = force.iter().zip(&lut).map(|(f, l)| f - l).collect();
        log::debug!(
            "M1M3 force error rms: {:.3}N",
            (error.iter().map(|e| e * e).sum::<f64>() / n as f64).sqrt()
        );
        self.fea.grid().with_z(actuators.surface(&error)?)
    }
}
impl Deformation for M1M3 {
    fn gravity_deformation(&self, zenith_angle: f64) -> Result<SurfaceMap> {
        let z = self.fea.print_through(zenith_angle, self.precomp_elevation);
        self.fea.grid().with_z(self.remove_ptt(&z)?)
    }
    fn thermal_correction(&self, vertical_gradient: f64, radial_gradient: f64) -> Result<SurfaceMap> {
        self.fea
            .grid()
            .with_z(self.fea.thermal(vertical_gradient, radial_gradient))
    }
}
impl MirrorAssembly for M1M3 {
    fn id(&self) -> MirrorId {
        MirrorId::M1M3
    }
    fn grid(&self) -> SurfaceMap {
        self.fea.grid()
    }
    fn modal_basis(&self) -> Option<&DMatrix<f64>> {
        self.modal_basis.as_ref()
    }
    fn optical_surfaces(&self) -> Vec<(SurfaceType, &MirrorSurface)> {
        vec![(SurfaceType::M1, &self.m1), (SurfaceType::M3, &self.m3)]
    }
    /// Sets the surface of M1 and M3, each mirror fitting the part of the surface inside its annulus
    fn set_surface(&mut self, surface: SurfaceMap) -> Result<()> {
        if surface.len() != self.fea.len() {
            return Err(MirrorError::SurfaceSize {
                expected: self.fea.len(),
                found: surface.len(),
            });
        }
        self.m1.set_surface(surface.clone());
        self.m3.set_surface(surface);
        Ok(())
    }
    /// Surface deformation with the gravity, the thermal gradients and the actuator force errors
    ///
    /// The force errors are only added if the actuator influence matrix is available
    fn condition_surface(&self, condition: &MirrorCondition) -> Result<SurfaceMap> {
        let gradient = condition.temperature(MirrorId::M1M3);
        let mut surface = self.gravity_deformation(condition.zenith_angle)?;
        surface.add(
            &self
                .thermal_correction(gradient.vertical, gradient.radial)?
                .z,
        )?;
        match &self.actuators {
            Some(actuators)
                if actuators.influence_matrix().is_some() && condition.m1m3_force_error > 0. =>
            {
                let error = self.force_error_surface(
                    condition.zenith_angle,
                    condition.m1m3_force_error,
                    condition.seed,
                )?;
                surface.add(&error.z)?;
            }
            _ => log::debug!("M1M3 surface without actuator force errors"),
        }
        Ok(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lut::ForceTable,
        mirror::{tests::fea, MirrorDataBuilder, SurfaceFit},
        Builder,
    };

    fn m1m3_fea() -> FeaData {
        let mut a = fea(2.558, 4.18);
        let b = fea(0.55, 2.508);
        a.x.extend(b.x);
        a.y.extend(b.y);
        a.zenith.extend(b.zenith);
        a.horizon.extend(b.horizon);
        a.vertical_gradient.extend(b.vertical_gradient);
        a.radial_gradient.extend(b.radial_gradient);
        a
    }

    fn m1m3() -> M1M3 {
        let fea = m1m3_fea();
        let n = fea.len();
        // 4 actuators: 3 along z, 1 along y
        let lut = DMatrix::from_row_slice(
            5,
            3,
            &[
                0., 45., 90., //
                100., 80., 10., //
                120., 90., 20., //
                110., 70., 15., //
                0., 50., 100.,
            ],
        );
        let influence = DMatrix::from_fn(n, 4, |i, j| 1e-3 * ((i + 1) * (j + 2) % 7) as f64);
        M1M3::builder()
            .fea_data(fea)
            .force_table_data(ForceTable::new(lut).unwrap())
            .influence_data(influence)
            .n_z_actuator(3)
            .build()
            .unwrap()
    }

    #[test]
    fn ptt_removed() {
        let m1m3 = m1m3();
        let s = m1m3.gravity_deformation(0.7).unwrap();
        let r = m1m3.m1().outer_radius();
        let (x, y): (Vec<f64>, Vec<f64>) = s.x.iter().zip(&s.y).map(|(x, y)| (x / r, y / r)).unzip();
        let c = ZernikeBasis::new(3, &x, &y).unwrap().fit(&s.z).unwrap();
        assert!(c.iter().all(|c| c.abs() < 1e-12), "{c:?}");
    }

    #[test]
    fn force_error_is_seeded() {
        let m1m3 = m1m3();
        let z = 30f64.to_radians();
        let a = m1m3.force_error_surface(z, 0.05, 6).unwrap();
        let b = m1m3.force_error_surface(z, 0.05, 6).unwrap();
        let c = m1m3.force_error_surface(z, 0.05, 7).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(m1m3
            .force_error_surface(z, 0., 6)
            .unwrap()
            .z
            .iter()
            .all(|z| *z == 0.));
    }

    #[test]
    fn force_error_out_of_lut_range() {
        let m1m3 = m1m3();
        assert!(m1m3
            .force_error_surface(100f64.to_radians(), 0.05, 6)
            .is_err());
    }

    #[test]
    fn condition_with_force_error() {
        let m1m3 = m1m3();
        let condition = MirrorCondition::default();
        let with_error = m1m3.condition_surface(&condition).unwrap();
        let without_error = m1m3
            .condition_surface(&MirrorCondition {
                m1m3_force_error: 0.,
                ..condition.clone()
            })
            .unwrap();
        let error = m1m3
            .force_error_surface(condition.zenith_angle, 0.05, condition.seed)
            .unwrap();
        with_error
            .z
            .iter()
            .zip(without_error.z.iter().zip(&error.z))
            .for_each(|(a, (b, e))| assert!((a - b - e).abs() < 1e-12));
    }

    #[test]
    fn m1_and_m3_share_the_surface() {
        let mut m1m3 = m1m3();
        let s = m1m3.thermal_correction(1., 1.).unwrap();
        m1m3.set_surface(s).unwrap();
        let surfaces = m1m3.optical_surfaces();
        assert_eq!(surfaces[0].0, SurfaceType::M1);
        assert_eq!(surfaces[1].0, SurfaceType::M3);
        let m1 = surfaces[0].1.grid_residual().unwrap();
        let m3 = surfaces[1].1.grid_residual().unwrap();
        assert!(m1.x.iter().zip(&m1.y).all(|(x, y)| x.hypot(*y) >= 2.558));
        assert!(m3.x.iter().zip(&m3.y).all(|(x, y)| x.hypot(*y) <= 2.508));
    }

    #[test]
    fn n_z_actuator_range() {
        let lut = DMatrix::from_row_slice(2, 2, &[0., 90., 1., 2.]);
        assert!(M1M3::builder()
            .fea_data(m1m3_fea())
            .force_table_data(ForceTable::new(lut).unwrap())
            .n_z_actuator(2)
            .build()
            .is_err());
    }
}
