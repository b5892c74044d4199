//!
//! # Active optics closed loop
//!
//! The closed loop is a state machine driven one transition at a time by [`ClosedLoop::step`]
//! or to completion by [`ClosedLoop::run`]:
//!
//! `Initialized → Simulating → Analyzing → Correcting → Simulating → ... → Exhausted`
//!
//! Each iteration
//!  1. writes the PhoSim files from the current DOF and runs PhoSim for the OPD and for the
//!     extra and intra focal star images,
//!  2. derives the PSSN and the effective FWHM from the OPD and estimates the wavefront errors
//!     from the defocal images,
//!  3. computes the DOF correction and accumulates it into the telescope DOF.
//!
//! The loop stops after a fixed number of iterations.
//! The OPD analysis, the wavefront estimation and the correction computation are external
//! collaborators implementing [`OpdAnalysis`], [`WavefrontEstimator`] and [`CorrectionController`].

use crate::{
    io,
    metrology::{self, PssnSummary, SensorFwhm, SensorWavefrontError, COMCAM_SENSORS},
    simulator::{Simulator, SimulatorRequest},
    sky::SkySim,
    telescope::{Defocus, Telescope},
    AoclcError, Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// Error type of the external collaborators
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ClosedLoopError {
    #[error("cannot create directory {1}")]
    CreateDir(#[source] std::io::Error, PathBuf),
    #[error("OPD analysis failed")]
    Analysis(#[source] CollaboratorError),
    #[error("wavefront estimation failed")]
    Estimation(#[source] CollaboratorError),
    #[error("DOF correction failed")]
    Correction(#[source] CollaboratorError),
    #[error("closed-loop iteration #{iteration} failed")]
    Iteration {
        iteration: usize,
        #[source]
        source: Box<AoclcError>,
    },
    #[error("cannot write the closed-loop summary {1}")]
    Summary(#[source] std::io::Error, PathBuf),
    #[error("cannot pickle the closed-loop summary")]
    Pickle(#[from] serde_pickle::Error),
    #[error("cannot open `::aoclc::ClosedLoopConfig` toml file: {1}")]
    ConfigOpen(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::aoclc::ClosedLoopConfig` toml file: {1}")]
    ConfigWrite(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::aoclc::ClosedLoopConfig` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::aoclc::ClosedLoopConfig` into toml")]
    Save(#[from] toml::ser::Error),
}

/// Default file names of the closed loop
pub mod files {
    pub const OPD_ZK: &str = "opd.zer";
    pub const WFS_ZK: &str = "wfs.zer";
    pub const PSSN: &str = "PSSN.txt";
    pub const DOF: &str = "dofPertInNextIter.mat";
    pub const SKY: &str = "skyComCamInfo.txt";
    pub const FWHM_ITERS: &str = "fwhmIters.txt";
    pub const SUMMARY: &str = "summary.pkl";
    pub const PERTURBATION_DIR: &str = "pert";
    pub const IMAGE_DIR: &str = "img";
}

/// Closed loop configuration
///
/// Default properties:
///  - iterations      : 5
///  - output          : `aoclc_output`
///  - first obs. id   : 9006000, incremented by 10 every iteration
///  - star magnitude  : 15
///  - SED             : `sed_flat.txt`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedLoopConfig {
    pub n_iteration: usize,
    pub output: PathBuf,
    pub obs_id: u64,
    pub obs_id_step: u64,
    pub star_magnitude: f64,
    pub sed: String,
    /// sky file, the stars are placed at the OPD field points if none
    pub sky: Option<PathBuf>,
    pub sensors: Vec<String>,
}
impl Default for ClosedLoopConfig {
    fn default() -> Self {
        Self {
            n_iteration: 5,
            output: PathBuf::from("aoclc_output"),
            obs_id: 9006000,
            obs_id_step: 10,
            star_magnitude: 15.,
            sed: "sed_flat.txt".into(),
            sky: None,
            sensors: COMCAM_SENSORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
impl ClosedLoopConfig {
    /// Loads the configuration from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ClosedLoopError> {
        let mut toml = String::new();
        File::open(&path)
            .and_then(|mut file| file.read_to_string(&mut toml))
            .map_err(|e| ClosedLoopError::ConfigOpen(e, path.as_ref().to_path_buf()))?;
        Ok(toml::from_str(&toml)?)
    }
    /// Saves the configuration into a toml file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ClosedLoopError> {
        let toml = toml::to_string_pretty(self)?;
        File::create(&path)
            .and_then(|mut file| write!(file, "# ::aoclc::ClosedLoopConfig\n\n{}", toml))
            .map_err(|e| ClosedLoopError::ConfigWrite(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    pub fn n_iteration(self, n_iteration: usize) -> Self {
        Self {
            n_iteration,
            ..self
        }
    }
    pub fn output<P: Into<PathBuf>>(self, output: P) -> Self {
        Self {
            output: output.into(),
            ..self
        }
    }
    pub fn obs_id(self, obs_id: u64) -> Self {
        Self { obs_id, ..self }
    }
    pub fn sky<P: Into<PathBuf>>(self, sky: P) -> Self {
        Self {
            sky: Some(sky.into()),
            ..self
        }
    }
    pub fn star_magnitude(self, star_magnitude: f64) -> Self {
        Self {
            star_magnitude,
            ..self
        }
    }
    /// Returns the directory of iteration `iteration`
    pub fn iteration_dir(&self, iteration: usize) -> PathBuf {
        self.output.join(format!("iter{}", iteration))
    }
}

/// OPD simulation output
#[derive(Debug, Clone, PartialEq)]
pub struct OpdData {
    pub obs_id: u64,
    pub dir: PathBuf,
    pub outputs: Vec<PathBuf>,
}

/// OPD analysis output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpdReport {
    /// Zernike coefficients of the OPD at each field point in micron
    pub zk: Vec<Vec<f64>>,
    /// PSSN at each field point
    pub pssn: Vec<f64>,
}

/// Defocal star image simulation output
#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    pub defocus: Defocus,
    pub obs_id: u64,
    pub dir: PathBuf,
    pub outputs: Vec<PathBuf>,
}

/// OPD analysis collaborator
pub trait OpdAnalysis {
    /// Computes the Zernike coefficients and the PSSN of the OPD at each field point
    fn analyze(&mut self, opd: &OpdData) -> std::result::Result<OpdReport, CollaboratorError>;
}

/// Wavefront estimation collaborator
pub trait WavefrontEstimator {
    /// Estimates the wavefront error of each sensor from the defocal images
    fn estimate(
        &mut self,
        intra: &Exposure,
        extra: &Exposure,
        sky: &Path,
    ) -> std::result::Result<Vec<SensorWavefrontError>, CollaboratorError>;
}

/// Optical feedback control collaborator
pub trait CorrectionController {
    /// Gives the effective FWHM of each sensor to the controller
    fn set_fwhm(&mut self, _fwhm: &[SensorFwhm]) {}
    /// Returns the DOF correction (micron and arcsec) for the wavefront errors
    fn correction(
        &mut self,
        wavefront: &[SensorWavefrontError],
    ) -> std::result::Result<Vec<f64>, CollaboratorError>;
}

/// Closed loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Initialized,
    Simulating(usize),
    Analyzing(usize),
    Correcting(usize),
    Exhausted,
}
impl LoopState {
    /// Returns the iteration index of the state
    pub fn iteration(&self) -> Option<usize> {
        match self {
            LoopState::Simulating(i) | LoopState::Analyzing(i) | LoopState::Correcting(i) => {
                Some(*i)
            }
            _ => None,
        }
    }
}
impl Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Initialized => write!(f, "initialized"),
            LoopState::Simulating(i) => write!(f, "simulating (iteration #{i})"),
            LoopState::Analyzing(i) => write!(f, "analyzing (iteration #{i})"),
            LoopState::Correcting(i) => write!(f, "correcting (iteration #{i})"),
            LoopState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Closed loop iteration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub obs_id: u64,
    pub extra_obs_id: u64,
    pub intra_obs_id: u64,
    pub pssn: Vec<f64>,
    pub gq_pssn: f64,
    pub gq_fwhm: f64,
    /// DOF for the next iteration
    pub dof: Vec<f64>,
}

/// Closed loop run summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub iterations: Vec<IterationSummary>,
}
impl RunSummary {
    /// Returns the GQ effective FWHM of each iteration
    pub fn gq_fwhm(&self) -> Vec<f64> {
        self.iterations.iter().map(|i| i.gq_fwhm).collect()
    }
    /// Writes the summary into `dir`
    ///
    /// `fwhmIters.txt` holds one row per iteration: iteration index, GQ PSSN and GQ effective FWHM;
    /// `summary.pkl` is the pickle of the summary.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        io::save_rows(
            dir.as_ref().join(files::FWHM_ITERS),
            self.iterations
                .iter()
                .map(|i| [i.iteration as f64, i.gq_pssn, i.gq_fwhm]),
        )?;
        let path = dir.as_ref().join(files::SUMMARY);
        let mut file =
            File::create(&path).map_err(|e| ClosedLoopError::Summary(e, path.clone()))?;
        serde_pickle::to_writer(&mut file, self, Default::default())
            .map_err(ClosedLoopError::from)?;
        Ok(())
    }
}

// data carried from one state of an iteration to the next
#[derive(Debug, Default)]
struct IterationData {
    obs_id: u64,
    opd: Option<OpdData>,
    exposures: Vec<Exposure>,
    sky: PathBuf,
    pssn: Option<PssnSummary>,
    wavefront: Vec<SensorWavefrontError>,
}

fn create_dir(dir: &Path) -> std::result::Result<(), ClosedLoopError> {
    fs::create_dir_all(dir).map_err(|e| ClosedLoopError::CreateDir(e, dir.to_path_buf()))
}

/// Active optics closed loop
pub struct ClosedLoop<S, A, W, C> {
    config: ClosedLoopConfig,
    telescope: Telescope,
    simulator: S,
    analysis: A,
    estimator: W,
    controller: C,
    state: LoopState,
    obs_id: u64,
    data: IterationData,
    summary: RunSummary,
}
impl<S, A, W, C> ClosedLoop<S, A, W, C>
where
    S: Simulator,
    A: OpdAnalysis,
    W: WavefrontEstimator,
    C: CorrectionController,
{
    /// Creates a new closed loop
    pub fn new(
        config: ClosedLoopConfig,
        telescope: Telescope,
        simulator: S,
        analysis: A,
        estimator: W,
        controller: C,
    ) -> Self {
        let obs_id = config.obs_id;
        Self {
            config,
            telescope,
            simulator,
            analysis,
            estimator,
            controller,
            state: LoopState::Initialized,
            obs_id,
            data: IterationData::default(),
            summary: RunSummary::default(),
        }
    }
    pub fn state(&self) -> LoopState {
        self.state
    }
    pub fn telescope(&self) -> &Telescope {
        &self.telescope
    }
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
    pub fn config(&self) -> &ClosedLoopConfig {
        &self.config
    }
    fn sensors(&self) -> Vec<&str> {
        self.config.sensors.iter().map(|s| s.as_str()).collect()
    }
    fn dirs(&self, iteration: usize) -> (PathBuf, PathBuf) {
        let dir = self.config.iteration_dir(iteration);
        (
            dir.join(files::PERTURBATION_DIR),
            dir.join(files::IMAGE_DIR),
        )
    }
    fn simulate(&mut self, iteration: usize) -> Result<()> {
        let (pert, img) = self.dirs(iteration);
        create_dir(&pert)?;
        create_dir(&img)?;
        let obs_id = self.obs_id;
        self.telescope.set_obs_id(obs_id);
        // OPD
        let args = self.telescope.write_opd_files(&pert, &img)?;
        let response = self
            .simulator
            .run(&SimulatorRequest::new(args, &img).log(pert.join("opd.log")))?;
        let opd = OpdData {
            obs_id,
            dir: img.clone(),
            outputs: response.outputs,
        };
        // sky
        let sky = match &self.config.sky {
            Some(path) => SkySim::from_file(path)?,
            None => SkySim::from_opd(self.telescope.metrology(), self.config.star_magnitude),
        };
        let sky_path = pert.join(files::SKY);
        sky.export(&sky_path)?;
        // defocal star images
        let obs_ids = (obs_id + 1, obs_id + 2);
        let args = self
            .telescope
            .write_star_files(&pert, &img, obs_ids, &sky, &self.config.sed)?;
        let mut exposures = vec![];
        for ((defocus, obs_id), args) in [(Defocus::Extra, obs_ids.0), (Defocus::Intra, obs_ids.1)]
            .into_iter()
            .zip(args)
        {
            let response = self.simulator.run(
                &SimulatorRequest::new(args, &img)
                    .log(pert.join(format!("star_{}.log", defocus.name()))),
            )?;
            exposures.push(Exposure {
                defocus,
                obs_id,
                dir: img.clone(),
                outputs: response.outputs,
            });
        }
        self.data = IterationData {
            obs_id,
            opd: Some(opd),
            exposures,
            sky: sky_path,
            ..Default::default()
        };
        Ok(())
    }
    fn analyze(&mut self, iteration: usize) -> Result<()> {
        let (_, img) = self.dirs(iteration);
        let opd = self.data.opd.as_ref().ok_or(ClosedLoopError::Analysis(
            "no OPD data for the analysis".into(),
        ))?;
        let report = self
            .analysis
            .analyze(opd)
            .map_err(ClosedLoopError::Analysis)?;
        metrology::save_zernikes(img.join(files::OPD_ZK), &report.zk)?;
        let pssn = self
            .telescope
            .metrology()
            .pssn_summary(report.pssn)?;
        pssn.save(img.join(files::PSSN))?;
        log::info!(
            "iteration #{}: GQ PSSN {:.6}, GQ effective FWHM {:.4}arcsec",
            iteration,
            pssn.gq_pssn,
            pssn.gq_fwhm
        );
        let sensors = self.sensors();
        let fwhm = pssn.sensor_fwhm(&sensors)?;
        self.controller.set_fwhm(&fwhm);
        let (extra, intra) = match self.data.exposures.as_slice() {
            [extra, intra] => (extra, intra),
            _ => {
                return Err(ClosedLoopError::Estimation(
                    "missing defocal exposures".into(),
                )
                .into())
            }
        };
        let wavefront = self
            .estimator
            .estimate(intra, extra, &self.data.sky)
            .map_err(ClosedLoopError::Estimation)?;
        self.data.pssn = Some(pssn);
        self.data.wavefront = wavefront;
        Ok(())
    }
    // The new DOF and the summary are committed once all the iteration files are written
    fn correct(&mut self, iteration: usize, last: bool) -> Result<()> {
        let (pert, img) = self.dirs(iteration);
        let delta = self
            .controller
            .correction(&self.data.wavefront)
            .map_err(ClosedLoopError::Correction)?;
        let mut dof = self.telescope.dof().clone();
        dof.accumulate(&delta)?;
        let sensors = self.sensors();
        metrology::save_wavefront_errors(img.join(files::WFS_ZK), &self.data.wavefront, &sensors)?;
        dof.save(pert.join(files::DOF))?;
        let pssn = self.data.pssn.clone().unwrap_or_else(|| PssnSummary {
            pssn: vec![],
            fwhm: vec![],
            gq_pssn: f64::NAN,
            gq_fwhm: f64::NAN,
        });
        let mut summary = self.summary.clone();
        summary.iterations.push(IterationSummary {
            iteration,
            obs_id: self.data.obs_id,
            extra_obs_id: self.data.obs_id + 1,
            intra_obs_id: self.data.obs_id + 2,
            pssn: pssn.pssn,
            gq_pssn: pssn.gq_pssn,
            gq_fwhm: pssn.gq_fwhm,
            dof: dof.state().to_vec(),
        });
        if last {
            summary.save(&self.config.output)?;
        }
        log::debug!("iteration #{}: {}", iteration, dof);
        *self.telescope.dof_mut() = dof;
        self.summary = summary;
        self.data.pssn = None;
        self.obs_id += self.config.obs_id_step;
        Ok(())
    }
    fn next_iteration(&self, iteration: usize) -> LoopState {
        if iteration + 1 < self.config.n_iteration {
            LoopState::Simulating(iteration + 1)
        } else {
            LoopState::Exhausted
        }
    }
    /// Performs one state transition and returns the new state
    pub fn step(&mut self) -> Result<LoopState> {
        let next = match self.state {
            LoopState::Initialized => {
                create_dir(&self.config.output)?;
                if self.config.n_iteration == 0 {
                    LoopState::Exhausted
                } else {
                    LoopState::Simulating(0)
                }
            }
            LoopState::Simulating(i) => {
                self.simulate(i)?;
                LoopState::Analyzing(i)
            }
            LoopState::Analyzing(i) => {
                self.analyze(i)?;
                LoopState::Correcting(i)
            }
            LoopState::Correcting(i) => {
                let next = self.next_iteration(i);
                self.correct(i, next == LoopState::Exhausted)?;
                next
            }
            LoopState::Exhausted => LoopState::Exhausted,
        };
        log::debug!("closed loop: {} -> {} (obs. id {})", self.state, next, self.obs_id);
        self.state = next;
        Ok(next)
    }
    /// Runs the closed loop until the iterations are exhausted
    ///
    /// On failure the iteration index and the DOF are logged and the loop is aborted;
    /// the run can be resumed from the DOF file of the last completed iteration.
    pub fn run(&mut self) -> Result<&RunSummary> {
        log::info!(
            "closed loop: {} iterations into {:?}",
            self.config.n_iteration,
            self.config.output
        );
        let pb = ProgressBar::new(self.config.n_iteration as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{eta_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7}")
        {
            pb.set_style(style);
        }
        pb.set_message("AOS closed loop");
        while self.state != LoopState::Exhausted {
            let state = self.state;
            match self.step() {
                Ok(LoopState::Simulating(i)) if i > 0 => pb.inc(1),
                Ok(LoopState::Exhausted) => pb.inc(1),
                Ok(_) => (),
                Err(e) => {
                    pb.abandon();
                    let iteration = state.iteration().unwrap_or_default();
                    log::error!(
                        "closed loop failed at iteration #{} while {}: {}",
                        iteration,
                        state,
                        e
                    );
                    log::error!("{}", self.telescope.dof());
                    return Err(ClosedLoopError::Iteration {
                        iteration,
                        source: Box::new(e),
                    }
                    .into());
                }
            }
        }
        pb.finish();
        Ok(&self.summary)
    }
}
