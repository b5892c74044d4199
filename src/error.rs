#[derive(Debug, thiserror::Error)]
pub enum AoclcError {
    #[error("Zernike polynomials failure")]
    Zernike(#[from] crate::zernike::ZernikeError),
    #[error("cannot build or update the mirror model")]
    Mirror(#[from] crate::mirror::MirrorError),
    #[error("actuator force look-up table failure")]
    Lut(#[from] crate::lut::LutError),
    #[error("telescope degrees of freedom failure")]
    Dof(#[from] crate::dof::DofError),
    #[error("PhoSim protocol failure")]
    Phosim(#[from] crate::phosim::PhosimError),
    #[error("OPD metrology failure")]
    Metrology(#[from] crate::metrology::MetrologyError),
    #[error("external simulator failure")]
    Simulator(#[from] crate::simulator::SimulatorError),
    #[error("closed-loop failure")]
    ClosedLoop(#[from] crate::closed_loop::ClosedLoopError),
    #[error("data file failure")]
    Io(#[from] crate::io::IoError),
    #[error("cannot load or save the telescope configuration")]
    Config(#[from] crate::telescope::ConfigError),
}
