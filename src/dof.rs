//!
//! # Telescope degrees of freedom
//!
//! The telescope state is a vector of [`N_DOF`] degrees of freedom (DOF) with the layout:
//!
//! | indices | DOF | unit |
//! |---------|-----|------|
//! | 0-4     | M2 hexapod: dz, dx, dy, rx, ry | micron, arcsec |
//! | 5-9     | camera hexapod: dz, dx, dy, rx, ry | micron, arcsec |
//! | 10-29   | M1M3 bending modes | micron |
//! | 30-49   | M2 bending modes | micron |
//!
//! The state is only ever updated by accumulating corrections: `new = old + delta`.

use crate::{
    io::{self, IoError},
    mirror::{MirrorAssembly, MirrorCondition, MirrorError, MirrorId, SurfaceMap, M1M3, M2},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, ops::Range, path::Path};

/// Number of telescope degrees of freedom
pub const N_DOF: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum DofError {
    #[error("expected {expected} degrees of freedom, found {found}")]
    Shape { expected: usize, found: usize },
    #[error("cannot update the mirror surfaces")]
    Mirror(#[from] MirrorError),
    #[error("cannot read or write the DOF file")]
    Data(#[from] IoError),
}
pub type Result<T> = std::result::Result<T, DofError>;

/// Layout of the degrees of freedom vector
pub struct DofLayout;
impl DofLayout {
    /// M2 hexapod: dz, dx, dy, rx, ry
    pub const M2_HEXAPOD: Range<usize> = 0..5;
    /// Camera hexapod: dz, dx, dy, rx, ry
    pub const CAMERA_HEXAPOD: Range<usize> = 5..10;
    /// Rigid body motions of M2 and of the camera
    pub const RIGID_BODY: Range<usize> = 0..10;
    pub const M1M3_MODES: Range<usize> = 10..30;
    pub const M2_MODES: Range<usize> = 30..50;
    /// Camera piston
    pub const CAMERA_PISTON: usize = 5;
    /// Number of bending modes of each mirror kept in the minimum DOF mode
    pub const N_MIN_MODE: usize = 3;
    const RIGID_BODY_NAMES: [&'static str; 5] = ["dz", "dx", "dy", "rx", "ry"];

    /// Returns the bending modes range of a mirror
    pub fn modes(id: MirrorId) -> Range<usize> {
        match id {
            MirrorId::M1M3 => Self::M1M3_MODES,
            MirrorId::M2 => Self::M2_MODES,
        }
    }
    /// Checks if the DOF at `index` is a rotation (arcsec)
    pub fn is_rotation(index: usize) -> bool {
        matches!(index, 3 | 4 | 8 | 9)
    }
    /// Checks if the DOF at `index` is a rigid body motion
    pub fn is_rigid_body(index: usize) -> bool {
        Self::RIGID_BODY.contains(&index)
    }
    /// Checks if the DOF at `index` is kept in the minimum DOF mode
    ///
    /// The minimum DOF are the 10 rigid body motions and the first 3 bending modes of M1M3 and M2
    pub fn is_min_dof(index: usize) -> bool {
        Self::is_rigid_body(index)
            || (Self::M1M3_MODES.start..Self::M1M3_MODES.start + Self::N_MIN_MODE)
                .contains(&index)
            || (Self::M2_MODES.start..Self::M2_MODES.start + Self::N_MIN_MODE).contains(&index)
    }
    /// Returns the indices of the minimum DOF
    pub fn min_dof() -> Vec<usize> {
        (0..N_DOF).filter(|&i| Self::is_min_dof(i)).collect()
    }
    /// Returns the name of the DOF at `index`
    pub fn name(index: usize) -> String {
        match index {
            i if Self::M2_HEXAPOD.contains(&i) => format!("M2 {}", Self::RIGID_BODY_NAMES[i]),
            i if Self::CAMERA_HEXAPOD.contains(&i) => {
                format!("camera {}", Self::RIGID_BODY_NAMES[i - 5])
            }
            i if Self::M1M3_MODES.contains(&i) => format!("M1M3 B{}", i - 9),
            i if Self::M2_MODES.contains(&i) => format!("M2 B{}", i - 29),
            i => format!("#{}", i),
        }
    }
}

fn check_len(found: usize) -> Result<()> {
    if found != N_DOF {
        Err(DofError::Shape {
            expected: N_DOF,
            found,
        })
    } else {
        Ok(())
    }
}

/// Telescope degrees of freedom aggregator
///
/// # Examples
///
/// ```
/// use aoclc::{dof::{DofLayout, N_DOF}, DofState};
/// let mut dof = DofState::new();
/// let mut delta = vec![0f64; N_DOF];
/// delta[DofLayout::CAMERA_PISTON] = 1000.;
/// dof.accumulate(&delta)?;
/// dof.accumulate(&delta)?;
/// assert_eq!(dof.state()[DofLayout::CAMERA_PISTON], 2000.);
/// # Ok::<(), aoclc::AoclcError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DofState {
    state: Vec<f64>,
    min_dof: bool,
}
impl Default for DofState {
    fn default() -> Self {
        Self {
            state: vec![0f64; N_DOF],
            min_dof: false,
        }
    }
}
impl DofState {
    /// Creates a new DOF state with all the DOF set to 0
    pub fn new() -> Self {
        Default::default()
    }
    /// Creates a new DOF state from a vector of [`N_DOF`] values
    pub fn from_vec(state: Vec<f64>) -> Result<Self> {
        check_len(state.len())?;
        Ok(Self {
            state,
            min_dof: false,
        })
    }
    /// Restricts the corrections to the minimum DOF
    pub fn use_min_dof(self, min_dof: bool) -> Self {
        Self { min_dof, ..self }
    }
    pub fn is_min_dof(&self) -> bool {
        self.min_dof
    }
    /// Adds `delta` to the state
    ///
    /// In minimum DOF mode, the DOF of `delta` outside the minimum DOF are ignored
    pub fn accumulate(&mut self, delta: &[f64]) -> Result<&mut Self> {
        check_len(delta.len())?;
        let min_dof = self.min_dof;
        self.state
            .iter_mut()
            .zip(delta)
            .enumerate()
            .filter(|(i, _)| !min_dof || DofLayout::is_min_dof(*i))
            .for_each(|(_, (s, d))| *s += d);
        Ok(self)
    }
    /// Replaces the state
    pub fn set(&mut self, state: &[f64]) -> Result<&mut Self> {
        check_len(state.len())?;
        self.state.copy_from_slice(state);
        Ok(self)
    }
    /// Returns the state
    pub fn state(&self) -> &[f64] {
        &self.state
    }
    /// Returns the rigid body motions of M2 and the camera
    pub fn rigid_body(&self) -> &[f64] {
        &self.state[DofLayout::RIGID_BODY]
    }
    /// Returns the bending modes of a mirror
    pub fn modes(&self, id: MirrorId) -> &[f64] {
        &self.state[DofLayout::modes(id)]
    }
    /// Updates the surface of a mirror assembly
    ///
    /// The surface is the sum of the deformations under the observing conditions
    /// and of the bending modes (if the mirror has a modal basis).
    /// Returns the new surface.
    pub fn apply_to_mirror<M: MirrorAssembly>(
        &self,
        mirror: &mut M,
        condition: &MirrorCondition,
    ) -> Result<SurfaceMap> {
        let mut surface = mirror.condition_surface(condition)?;
        let modes = self.modes(mirror.id());
        match mirror.bending_surface(modes) {
            Ok(Some(bending)) => {
                surface.add(&bending)?;
            }
            Ok(None) => (),
            Err(MirrorError::ModeShape { expected, found }) => {
                return Err(DofError::Shape { expected, found })
            }
            Err(e) => return Err(e.into()),
        }
        log::debug!(
            "{} surface rms: {:.3e}micron",
            mirror.id(),
            surface.rms()
        );
        mirror.set_surface(surface.clone())?;
        Ok(surface)
    }
    /// Updates the surfaces of M1M3 and M2
    pub fn apply_to_mirrors(
        &self,
        m1m3: &mut M1M3,
        m2: &mut M2,
        condition: &MirrorCondition,
    ) -> Result<BTreeMap<MirrorId, SurfaceMap>> {
        let mut surfaces = BTreeMap::new();
        surfaces.insert(MirrorId::M1M3, self.apply_to_mirror(m1m3, condition)?);
        surfaces.insert(MirrorId::M2, self.apply_to_mirror(m2, condition)?);
        Ok(surfaces)
    }
    /// Saves the state into a text file, one DOF per line
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        io::save_rows(path.as_ref(), self.state.iter().map(|x| [*x]))?;
        log::info!("DOF state saved to {:?}", path.as_ref());
        Ok(())
    }
    /// Loads the state from a text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let state: Vec<f64> = io::load_rows(path)?.into_iter().flatten().collect();
        Self::from_vec(state)
    }
}
impl Display for DofState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active: Vec<_> = self
            .state
            .iter()
            .enumerate()
            .filter(|(_, x)| **x != 0.)
            .collect();
        if active.is_empty() {
            return write!(f, "DOF: all null");
        }
        writeln!(f, "DOF:")?;
        for (i, x) in active {
            writeln!(f, " - {:>2} {:<12}: {:+.6}", i, DofLayout::name(i), x)?;
        }
        Ok(())
    }
}
