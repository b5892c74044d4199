//!
//! # Active optics closed-loop driver
//!
//! The crate drives an active optics closed-loop simulation of a segmented-mirror telescope
//! with [PhoSim](https://bitbucket.org/phosim/phosim_release) as the optical ray tracer.
//!
//! It provides:
//!  - the mirror surface models ([`M1M3`], [`M2`]): gravity print-through, thermal correction,
//!    actuator force errors and bending modes, fitted with annulus-restricted [Zernike](zernike) polynomials,
//!  - the actuator force look-up table interpolation and force correction ([`ActuatorForceCorrector`]),
//!  - the telescope degrees-of-freedom aggregator ([`DofState`]),
//!  - the PhoSim text protocol ([`phosim`]) and the simulator invocation ([`Simulator`]),
//!  - the closed-loop iteration state machine ([`ClosedLoop`]).
//!
//! Wavefront estimation and the optical feedback control are external collaborators
//! plugged into the loop through the [`WavefrontEstimator`], [`CorrectionController`]
//! and [`OpdAnalysis`] traits.
//!
//! The mirror models are created with their builders:
//! ```no_run
//! use aoclc::{mirror::MirrorDataBuilder, Builder, FromBuilder, M2};
//! let m2 = M2::builder()
//!     .fea("data/M2/M2_GT_FEA.txt")
//!     .build()?;
//! # Ok::<(), aoclc::AoclcError>(())
//! ```

pub mod closed_loop;
pub mod dof;
pub mod error;
pub mod io;
pub mod lut;
pub mod metrology;
pub mod mirror;
pub mod phosim;
pub mod simulator;
pub mod sky;
pub mod telescope;
pub mod zernike;

#[doc(inline)]
pub use self::closed_loop::{
    ClosedLoop, ClosedLoopConfig, CorrectionController, LoopState, OpdAnalysis, RunSummary,
    WavefrontEstimator,
};
#[doc(inline)]
pub use self::dof::{DofLayout, DofState};
#[doc(inline)]
pub use self::error::AoclcError;
#[doc(inline)]
pub use self::lut::{ActuatorForceCorrector, ForceTable};
#[doc(inline)]
pub use self::metrology::OpdMetrology;
#[doc(inline)]
pub use self::mirror::{
    Deformation, MirrorAssembly, MirrorSurface, SurfaceFit, SurfaceMap, M1M3, M2,
};
#[doc(inline)]
pub use self::phosim::{FilterType, PerturbationCommandSet, SurfaceType};
#[doc(inline)]
pub use self::simulator::{PhoSim, Simulator};
#[doc(inline)]
pub use self::sky::SkySim;
#[doc(inline)]
pub use self::telescope::{Telescope, TelescopeBuilder};

pub type Result<T> = std::result::Result<T, AoclcError>;

/// Component builder type trait
pub trait Builder: Default {
    type Component;
    fn new() -> Self {
        Default::default()
    }
    fn build(self) -> Result<Self::Component>;
}

/// Gives access to the builder of a component
pub trait FromBuilder {
    type ComponentBuilder: Builder;
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::default()
    }
}
