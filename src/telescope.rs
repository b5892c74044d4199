//!
//! # Telescope
//!
//! The telescope gathers the survey parameters, the mirror models and the degrees of freedom,
//! and writes the PhoSim command files and instance catalogs of the OPD and of the
//! defocal star images.

use crate::{
    dof::{DofLayout, DofState},
    metrology::{OpdMetrology, COMCAM_SENSORS},
    mirror::{
        M1M3Builder, M2Builder, MirrorAssembly, MirrorCondition, MirrorId, SurfaceMap, M1M3, M2,
    },
    phosim::{
        self, CameraConfig, FilterType, InstanceHeader, PerturbationCommandSet, PhoSimArgs,
        Statement, SurfaceType,
    },
    sky::SkySim,
    Builder, FromBuilder, Result,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open `::aoclc::TelescopeBuilder` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::aoclc::TelescopeBuilder` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::aoclc::TelescopeBuilder` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::aoclc::TelescopeBuilder` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::aoclc::TelescopeBuilder` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::aoclc::TelescopeBuilder` into toml")]
    Save(#[from] toml::ser::Error),
    #[error("cannot read the PhoSim settings file: {1}")]
    Settings(#[source] std::io::Error, PathBuf),
}

/// Survey parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub obs_id: u64,
    pub filter: FilterType,
    /// right ascension and declination in degrees
    pub boresight: (f64, f64),
    /// zenith angle in degrees
    pub zenith_angle: f64,
    /// sky rotation angle in degrees
    pub rotation: f64,
    pub mjd: f64,
}
impl Default for Survey {
    fn default() -> Self {
        Self {
            obs_id: 9006000,
            filter: FilterType::default(),
            boresight: (0., 0.),
            zenith_angle: 27.0912,
            rotation: 0.,
            mjd: 59580.,
        }
    }
}
impl Survey {
    fn header(&self, obs_id: u64) -> InstanceHeader {
        InstanceHeader {
            obs_id,
            filter_id: self.filter.instance_id(),
            mjd: self.mjd,
            boresight: self.boresight,
            rotation: self.rotation,
        }
    }
}

/// Defocal exposures of the wavefront sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Defocus {
    /// camera moved away from the telescope
    Extra,
    /// camera moved toward the telescope
    Intra,
}
impl Defocus {
    pub fn name(&self) -> &'static str {
        match self {
            Defocus::Extra => "extra",
            Defocus::Intra => "intra",
        }
    }
    fn sign(&self) -> f64 {
        match self {
            Defocus::Extra => 1.,
            Defocus::Intra => -1.,
        }
    }
}

/// [`Telescope`] builder
///
/// Default properties:
///  - survey           : obs. id 9006000, r filter, boresight (0,0), zenith angle 27.0912deg
///  - defocal distance : 1.5mm
///  - mirror condition : M2 thermal gradients (-0.0675,-0.1416), 5% M1M3 force error, seed 6
///  - PhoSim           : 1 process, 1 thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelescopeBuilder {
    /// camera defocal distance in mm
    pub defocal_distance: f64,
    pub min_dof: bool,
    /// initial DOF file
    pub initial_dof: Option<PathBuf>,
    /// PhoSim command settings file, copied at the beginning of every command file
    pub settings: Option<PathBuf>,
    /// write the mirror residual maps as `surfacemap` statements
    pub surface_map: bool,
    pub n_process: usize,
    pub n_thread: usize,
    pub camera: CameraConfig,
    pub survey: Survey,
    pub condition: MirrorCondition,
    pub m1m3: M1M3Builder,
    pub m2: M2Builder,
}
impl Default for TelescopeBuilder {
    fn default() -> Self {
        Self {
            defocal_distance: 1.5,
            min_dof: false,
            initial_dof: None,
            settings: None,
            surface_map: true,
            n_process: 1,
            n_thread: 1,
            camera: CameraConfig::default(),
            survey: Survey::default(),
            condition: MirrorCondition::default(),
            m1m3: M1M3Builder::default(),
            m2: M2Builder::default(),
        }
    }
}
impl TelescopeBuilder {
    /// Loads the telescope builder from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let mut file =
            File::open(&path).map_err(|e| ConfigError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| ConfigError::Read(e, path.as_ref().to_path_buf()))?;
        Ok(toml::from_str(&toml)?)
    }
    /// Saves the telescope builder into a toml file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| ConfigError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::aoclc::TelescopeBuilder\n\n{}", toml)
            .map_err(|e| ConfigError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    pub fn survey(self, survey: Survey) -> Self {
        Self { survey, ..self }
    }
    /// Sets the filter
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.survey.filter = filter;
        self
    }
    /// Sets the zenith angle in degrees
    pub fn zenith_angle(mut self, zenith_angle: f64) -> Self {
        self.survey.zenith_angle = zenith_angle;
        self
    }
    /// Sets the mirror deformation conditions
    ///
    /// The zenith angle of the conditions is superseded by the survey zenith angle
    pub fn condition(self, condition: MirrorCondition) -> Self {
        Self { condition, ..self }
    }
    /// Sets the ratio of the M1M3 actuator force error
    pub fn m1m3_force_error(mut self, ratio: f64) -> Self {
        self.condition.m1m3_force_error = ratio;
        self
    }
    /// Sets the seed of the random generators
    pub fn seed(mut self, seed: u64) -> Self {
        self.condition.seed = seed;
        self
    }
    pub fn m1m3(self, m1m3: M1M3Builder) -> Self {
        Self { m1m3, ..self }
    }
    pub fn m2(self, m2: M2Builder) -> Self {
        Self { m2, ..self }
    }
    /// Sets the camera defocal distance in mm
    pub fn defocal_distance(self, defocal_distance: f64) -> Self {
        Self {
            defocal_distance,
            ..self
        }
    }
    /// Restricts the DOF corrections to the minimum DOF
    pub fn min_dof(self, min_dof: bool) -> Self {
        Self { min_dof, ..self }
    }
    /// Sets the file the initial DOF are loaded from
    pub fn initial_dof<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            initial_dof: Some(path.into()),
            ..self
        }
    }
    /// Sets the PhoSim command settings file
    pub fn settings<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            settings: Some(path.into()),
            ..self
        }
    }
    /// Writes the mirror residual maps as `surfacemap` statements (`true`) or not (`false`)
    pub fn surface_map(self, surface_map: bool) -> Self {
        Self {
            surface_map,
            ..self
        }
    }
    pub fn camera(self, camera: CameraConfig) -> Self {
        Self { camera, ..self }
    }
    /// Sets the number of PhoSim processes and threads
    pub fn phosim_parallelism(self, n_process: usize, n_thread: usize) -> Self {
        Self {
            n_process,
            n_thread,
            ..self
        }
    }
}
impl Builder for TelescopeBuilder {
    type Component = Telescope;
    fn build(self) -> Result<Telescope> {
        let dof = match &self.initial_dof {
            Some(path) => DofState::load(path)?,
            None => DofState::new(),
        }
        .use_min_dof(self.min_dof);
        let settings = match &self.settings {
            Some(path) => {
                fs::read_to_string(path).map_err(|e| ConfigError::Settings(e, path.clone()))?
            }
            None => String::new(),
        };
        let wavelength = self.survey.filter.wavelength();
        let telescope = Telescope {
            m1m3: self.m1m3.build()?,
            m2: self.m2.build()?,
            dof,
            survey: self.survey,
            condition: self.condition,
            defocal_distance: self.defocal_distance,
            settings,
            surface_map: self.surface_map,
            n_process: self.n_process,
            n_thread: self.n_thread,
            camera: self.camera,
            metrology: OpdMetrology::comcam().wavelength(wavelength),
        };
        log::info!(
            "telescope: obs. id {}, {} filter, zenith angle {:.4}deg",
            telescope.survey.obs_id,
            telescope.survey.filter,
            telescope.survey.zenith_angle
        );
        Ok(telescope)
    }
}
/// Telescope
#[derive(Debug, Clone)]
pub struct Telescope {
    survey: Survey,
    m1m3: M1M3,
    m2: M2,
    dof: DofState,
    condition: MirrorCondition,
    defocal_distance: f64,
    settings: String,
    surface_map: bool,
    n_process: usize,
    n_thread: usize,
    camera: CameraConfig,
    metrology: OpdMetrology,
}
impl FromBuilder for Telescope {
    type ComponentBuilder = TelescopeBuilder;
}
impl Telescope {
    pub fn survey(&self) -> &Survey {
        &self.survey
    }
    /// Sets the observation id
    pub fn set_obs_id(&mut self, obs_id: u64) -> &mut Self {
        self.survey.obs_id = obs_id;
        self
    }
    pub fn m1m3(&self) -> &M1M3 {
        &self.m1m3
    }
    pub fn m2(&self) -> &M2 {
        &self.m2
    }
    pub fn metrology(&self) -> &OpdMetrology {
        &self.metrology
    }
    /// Returns the camera defocal distance in mm
    pub fn defocal_distance(&self) -> f64 {
        self.defocal_distance
    }
    pub fn dof(&self) -> &DofState {
        &self.dof
    }
    pub fn dof_mut(&mut self) -> &mut DofState {
        &mut self.dof
    }
    /// Mirror deformation conditions at the survey zenith angle
    pub fn condition(&self) -> MirrorCondition {
        MirrorCondition {
            zenith_angle: self.survey.zenith_angle.to_radians(),
            ..self.condition.clone()
        }
    }
    /// Updates the mirror surfaces with the current DOF
    pub fn update_mirrors(&mut self) -> Result<BTreeMap<MirrorId, SurfaceMap>> {
        let condition = self.condition();
        Ok(self
            .dof
            .apply_to_mirrors(&mut self.m1m3, &mut self.m2, &condition)?)
    }
    // Sets the mirror surfaces to the deformations under the observing conditions,
    // the bending modes reach PhoSim through the `move` statements
    fn condition_mirrors(&mut self) -> Result<()> {
        let condition = self.condition();
        let surface = self.m1m3.condition_surface(&condition)?;
        self.m1m3.set_surface(surface)?;
        let surface = self.m2.condition_surface(&condition)?;
        self.m2.set_surface(surface)?;
        Ok(())
    }
    // izernike and surfacemap statements of a mirror assembly
    fn mirror_statements<M: MirrorAssembly>(
        mirror: &M,
        dir: &Path,
        surface_map: bool,
    ) -> Result<Vec<Statement>> {
        let mut statements = vec![];
        for (surface, path, zk_mm) in mirror.write_surface_results(dir)? {
            statements.push(Statement::Zernike(surface, zk_mm));
            if surface_map {
                statements.push(Statement::SurfaceMap(surface, path, 1));
            }
        }
        Ok(statements)
    }
    /// Builds the perturbation command set
    ///
    /// The DOF are written as `move` statements, bending modes included.
    /// The mirror surfaces are set to the deformations under the observing conditions
    /// and their surface result files are written into `dir`.
    pub fn perturbation_commands<P: AsRef<Path>>(
        &mut self,
        dir: P,
    ) -> Result<PerturbationCommandSet> {
        self.condition_mirrors()?;
        let mut commands = PerturbationCommandSet::new();
        commands.push(Statement::Dof(self.dof.state().to_vec()));
        commands.extend(Self::mirror_statements(
            &self.m1m3,
            dir.as_ref(),
            self.surface_map,
        )?);
        commands.push(Statement::SurfaceLink(SurfaceType::M3, SurfaceType::M1));
        commands.extend(Self::mirror_statements(
            &self.m2,
            dir.as_ref(),
            self.surface_map,
        )?);
        if self.camera.bitmask() > 0 {
            commands.push(Statement::Camera(self.camera));
        }
        Ok(commands)
    }
    /// Writes a command file: the settings followed by the perturbation commands
    pub fn write_cmd_file<P: AsRef<Path>>(
        &self,
        path: P,
        commands: &PerturbationCommandSet,
    ) -> Result<()> {
        phosim::write_to_file(path.as_ref(), &self.settings, false)?;
        commands.write(path.as_ref(), true)?;
        Ok(())
    }
    /// Returns a copy of the perturbation commands with the camera moved to a defocal position
    pub fn defocal_commands(
        &self,
        commands: &PerturbationCommandSet,
        defocus: Defocus,
    ) -> PerturbationCommandSet {
        commands
            .statements()
            .iter()
            .cloned()
            .map(|statement| match statement {
                Statement::Dof(mut dof) => {
                    dof[DofLayout::CAMERA_PISTON] += defocus.sign() * self.defocal_distance * 1e3;
                    Statement::Dof(dof)
                }
                statement => statement,
            })
            .collect()
    }
    /// OPD instance catalog
    pub fn opd_instance(&self) -> String {
        let mut content = self.survey.header(self.survey.obs_id).opd();
        for (id, (x, y)) in self.metrology.fields().enumerate() {
            content.push_str(&phosim::opd(id, x, y, self.metrology.wavelength));
        }
        content
    }
    /// Star instance catalog
    pub fn star_instance(&self, obs_id: u64, sky: &SkySim, sed: &str) -> String {
        let mut content = self.survey.header(obs_id).star();
        content.push_str(&sky.phosim_objects(sed));
        content
    }
    fn args<P: AsRef<Path>>(&self, instance: P, command: P, output: P) -> PhoSimArgs {
        PhoSimArgs::new(instance.as_ref())
            .command(command.as_ref())
            .output(output.as_ref())
            .n_process(self.n_process)
            .n_thread(self.n_thread)
    }
    /// Writes the OPD command file and instance catalog into `dir`
    ///
    /// Returns the PhoSim arguments with `output` as the output directory
    pub fn write_opd_files<P: AsRef<Path>>(&mut self, dir: P, output: P) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let commands = self.perturbation_commands(dir)?;
        let cmd = dir.join("OPD.cmd");
        self.write_cmd_file(&cmd, &commands)?;
        let inst = dir.join("OPD.inst");
        phosim::write_to_file(&inst, &self.opd_instance(), false)?;
        Ok(self
            .args(inst.as_path(), cmd.as_path(), output.as_ref())
            .to_args()?)
    }
    /// Writes the command files and instance catalogs of the extra and intra focal star images into `dir`
    ///
    /// Returns the PhoSim arguments of the extra and intra focal exposures,
    /// with `output` as the output directory
    pub fn write_star_files<P: AsRef<Path>>(
        &mut self,
        dir: P,
        output: P,
        obs_ids: (u64, u64),
        sky: &SkySim,
        sed: &str,
    ) -> Result<Vec<Vec<String>>> {
        let dir = dir.as_ref();
        let commands = self.perturbation_commands(dir)?;
        let sensors = COMCAM_SENSORS.join("|");
        [(Defocus::Extra, obs_ids.0), (Defocus::Intra, obs_ids.1)]
            .into_iter()
            .map(|(defocus, obs_id)| -> Result<Vec<String>> {
                let cmd = dir.join(format!("star_{}.cmd", defocus.name()));
                self.write_cmd_file(&cmd, &self.defocal_commands(&commands, defocus))?;
                let inst = dir.join(format!("star_{}.inst", defocus.name()));
                phosim::write_to_file(&inst, &self.star_instance(obs_id, sky, sed), false)?;
                Ok(self
                    .args(inst.as_path(), cmd.as_path(), output.as_ref())
                    .sensor(&sensors)
                    .to_args()?)
            })
            .collect()
    }
}
