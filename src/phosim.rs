//!
//! # PhoSim text protocol
//!
//! PhoSim reads the optical state of the telescope from text statements written into
//! command files and instance catalogs.
//! The statements are formatted byte for byte as PhoSim expects them.
//!
//! # Examples
//!
//! ```
//! use aoclc::phosim::{self, SurfaceType};
//! assert_eq!(phosim::surface_perturbation(SurfaceType::M2, &[1.]), "izernike 1 0 1 \n");
//! assert_eq!(phosim::surface_link(SurfaceType::M2, SurfaceType::M3), "surfacelink 1 2 \n");
//! ```

use crate::dof::{DofLayout, N_DOF};
use serde::{Deserialize, Serialize};
use skyangle::Conversion;
use std::{
    fmt::Display,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, thiserror::Error)]
pub enum PhosimError {
    #[error("the {0} filter has no PhoSim id")]
    Filter(FilterType),
    #[error("unknown filter {0:?}")]
    ParseFilter(String),
    #[error("expected {expected} degrees of freedom, found {found}")]
    DofShape { expected: usize, found: usize },
    #[error("cannot resolve the absolute path of {1}")]
    Path(#[source] std::io::Error, PathBuf),
    #[error("cannot write PhoSim file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
}
pub type Result<T> = std::result::Result<T, PhosimError>;

/// Telescope filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    U,
    G,
    #[default]
    R,
    I,
    Z,
    Y,
    /// Reference wavelength, not a physical filter
    Ref,
}
impl FilterType {
    /// Returns the PhoSim filter id
    ///
    /// The reference filter has no id
    pub fn phosim_id(&self) -> Result<u8> {
        match self {
            FilterType::U => Ok(0),
            FilterType::G => Ok(1),
            FilterType::R => Ok(2),
            FilterType::I => Ok(3),
            FilterType::Z => Ok(4),
            FilterType::Y => Ok(5),
            FilterType::Ref => Err(PhosimError::Filter(*self)),
        }
    }
    /// Returns the PhoSim filter id of the instance catalogs
    ///
    /// The reference wavelength is simulated through the g filter
    pub fn instance_id(&self) -> u8 {
        match self {
            FilterType::Ref => 1,
            filter => filter.phosim_id().unwrap_or_default(),
        }
    }
    /// Returns the filter effective wavelength in nm
    pub fn wavelength(&self) -> f64 {
        match self {
            FilterType::U => 365.49,
            FilterType::G => 480.03,
            FilterType::R => 622.2,
            FilterType::I => 754.06,
            FilterType::Z => 868.21,
            FilterType::Y => 991.66,
            FilterType::Ref => 500.,
        }
    }
}
impl Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterType::U => "u",
            FilterType::G => "g",
            FilterType::R => "r",
            FilterType::I => "i",
            FilterType::Z => "z",
            FilterType::Y => "y",
            FilterType::Ref => "ref",
        };
        write!(f, "{}", name)
    }
}
impl FromStr for FilterType {
    type Err = PhosimError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "u" => Ok(FilterType::U),
            "g" => Ok(FilterType::G),
            "r" => Ok(FilterType::R),
            "i" => Ok(FilterType::I),
            "z" => Ok(FilterType::Z),
            "y" => Ok(FilterType::Y),
            "ref" => Ok(FilterType::Ref),
            _ => Err(PhosimError::ParseFilter(s.into())),
        }
    }
}

/// Optical surfaces of the telescope and of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    M1,
    M2,
    M3,
    L1,
    L1E,
    L2F,
    L2E,
    Filter,
    FilterE,
    L3F,
    L3E,
    FP,
    Chip,
}
impl SurfaceType {
    /// Returns the PhoSim surface id
    pub fn phosim_id(&self) -> u8 {
        *self as u8
    }
}
impl Display for SurfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Camera sub-systems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub science_sensor: bool,
    pub wavefront_sensor: bool,
    pub guider_sensor: bool,
}
impl CameraConfig {
    /// Returns the PhoSim bit mask of the camera sub-systems
    pub fn bitmask(&self) -> u8 {
        self.science_sensor as u8
            | (self.wavefront_sensor as u8) << 1
            | (self.guider_sensor as u8) << 2
    }
}

/// Converts a DOF from the telescope units (micron and arcsec) into the PhoSim units (mm and degree)
///
/// The bending modes are left in micron
pub fn dof_to_phosim(index: usize, value: f64) -> f64 {
    if DofLayout::is_rotation(index) {
        value.from_arcsec().to_degrees()
    } else if DofLayout::is_rigid_body(index) {
        value * 1e-3
    } else {
        value
    }
}

/// `move` statements of all the degrees of freedom
///
/// `dof` is in micron and arcsec
pub fn dof_perturbation(dof: &[f64]) -> Result<String> {
    if dof.len() != N_DOF {
        return Err(PhosimError::DofShape {
            expected: N_DOF,
            found: dof.len(),
        });
    }
    Ok(dof
        .iter()
        .enumerate()
        .map(|(i, x)| format!("move {} {:7.4} \n", i, dof_to_phosim(i, *x)))
        .collect())
}

/// Formats a coefficient like Python `str` does for numbers
///
/// Exponent notation below 1e-4 and from 1e16: `1.2e-05`, integral values without decimal point
pub fn format_coefficient(x: f64) -> String {
    let a = x.abs();
    if a.is_finite() && a != 0. && !(1e-4..1e16).contains(&a) {
        let s = format!("{:e}", x);
        match s.split_once('e') {
            Some((mantissa, exp)) => {
                let e: i32 = exp.parse().unwrap_or_default();
                format!(
                    "{}e{}{:02}",
                    mantissa,
                    if e < 0 { '-' } else { '+' },
                    e.abs()
                )
            }
            None => s,
        }
    } else {
        x.to_string()
    }
}

/// `izernike` statements of a surface
///
/// `zk` are the Zernike coefficients in mm, the first one being the piston
pub fn surface_perturbation(surface: SurfaceType, zk: &[f64]) -> String {
    zk.iter()
        .enumerate()
        .map(|(j, c)| {
            format!(
                "izernike {} {} {} \n",
                surface.phosim_id(),
                j,
                format_coefficient(*c)
            )
        })
        .collect()
}

/// `surfacemap` statement of a surface
///
/// The path of the surface file is made absolute
pub fn surface_map_perturbation<P: AsRef<Path>>(
    surface: SurfaceType,
    path: P,
    relative_scale: i32,
) -> Result<String> {
    let path = absolute(path)?;
    Ok(format!(
        "surfacemap {} {} {} \n",
        surface.phosim_id(),
        path.display(),
        relative_scale
    ))
}

/// `surfacelink` statement
pub fn surface_link(surface: SurfaceType, linked_surface: SurfaceType) -> String {
    format!(
        "surfacelink {} {} \n",
        surface.phosim_id(),
        linked_surface.phosim_id()
    )
}

/// `camconfig` statement
pub fn camera_config(config: CameraConfig) -> String {
    format!("camconfig {} \n", config.bitmask())
}

/// `opd` statement of an OPD field point
pub fn opd(id: usize, field_x: f64, field_y: f64, wavelength: f64) -> String {
    format!(
        "opd {:2}\t {:3.6}\t {:3.6} {:.1} \n",
        id, field_x, field_y, wavelength
    )
}

/// `object` statement of a star
///
/// `ra` and `dec` in degrees, `sed` is the name of the SED file in the PhoSim `sky` directory
pub fn star(id: usize, ra: f64, dec: f64, magnitude: f64, sed: &str) -> String {
    format!(
        "object {:2}\t{:9.6}\t{:9.6} {:9.6} ../sky/{} 0.0 0.0 0.0 0.0 0.0 0.0 star 0.0 none none \n",
        id, ra, dec, magnitude, sed
    )
}

/// Instance catalog header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceHeader {
    pub obs_id: u64,
    pub filter_id: u8,
    pub mjd: f64,
    /// boresight right ascension and declination in degrees
    pub boresight: (f64, f64),
    /// sky rotation angle in degrees
    pub rotation: f64,
}
impl InstanceHeader {
    fn seed(&self) -> u64 {
        self.obs_id % 10000 + 4
    }
    /// Header of an OPD instance catalog
    pub fn opd(&self) -> String {
        format!(
            "Opsim_obshistid {}\nOpsim_filter {}\nmjd {:.10}\nSIM_SEED {}\nOpsim_rawseeing -1\n",
            self.obs_id,
            self.filter_id,
            self.mjd,
            self.seed()
        )
    }
    /// Header of a star instance catalog
    pub fn star(&self) -> String {
        let (ra, dec) = self.boresight;
        format!(
            "Opsim_obshistid {}\nOpsim_filter {}\nmjd {:.10}\nSIM_SEED {}\nrightascension {:.6}\ndeclination {:.6}\nrotskypos {:.6}\n",
            self.obs_id,
            self.filter_id,
            self.mjd,
            self.seed(),
            ra,
            dec,
            self.rotation
        )
    }
}

fn absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    std::path::absolute(path.as_ref()).map_err(|e| PhosimError::Path(e, path.as_ref().into()))
}

/// PhoSim command line arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoSimArgs {
    pub instance: PathBuf,
    pub instrument: String,
    pub e2adc: u8,
    pub command: Option<PathBuf>,
    pub n_process: usize,
    pub n_thread: usize,
    pub output: Option<PathBuf>,
    pub sensor: Option<String>,
}
impl PhoSimArgs {
    /// Creates the arguments for the instance catalog `instance`
    ///
    /// Defaults: LSST instrument, electron to ADC conversion on, 1 process with 1 thread
    pub fn new<P: Into<PathBuf>>(instance: P) -> Self {
        Self {
            instance: instance.into(),
            instrument: "lsst".into(),
            e2adc: 1,
            command: None,
            n_process: 1,
            n_thread: 1,
            output: None,
            sensor: None,
        }
    }
    pub fn instrument(self, instrument: &str) -> Self {
        Self {
            instrument: instrument.into(),
            ..self
        }
    }
    /// Sets the electron to ADC conversion flag
    pub fn e2adc(self, e2adc: bool) -> Self {
        Self {
            e2adc: e2adc as u8,
            ..self
        }
    }
    pub fn command<P: Into<PathBuf>>(self, command: P) -> Self {
        Self {
            command: Some(command.into()),
            ..self
        }
    }
    pub fn n_process(self, n_process: usize) -> Self {
        Self { n_process, ..self }
    }
    pub fn n_thread(self, n_thread: usize) -> Self {
        Self { n_thread, ..self }
    }
    pub fn output<P: Into<PathBuf>>(self, output: P) -> Self {
        Self {
            output: Some(output.into()),
            ..self
        }
    }
    pub fn sensor(self, sensor: &str) -> Self {
        Self {
            sensor: Some(sensor.into()),
            ..self
        }
    }
    /// Returns the command line arguments with absolute paths
    pub fn to_args(&self) -> Result<Vec<String>> {
        let mut args = vec![
            absolute(&self.instance)?.display().to_string(),
            "-i".into(),
            self.instrument.clone(),
            "-e".into(),
            self.e2adc.to_string(),
        ];
        if let Some(command) = &self.command {
            args.extend(["-c".into(), absolute(command)?.display().to_string()]);
        }
        if self.n_process > 1 {
            args.extend(["-p".into(), self.n_process.to_string()]);
        }
        if self.n_thread > 1 {
            args.extend(["-t".into(), self.n_thread.to_string()]);
        }
        if let Some(output) = &self.output {
            args.extend(["-o".into(), absolute(output)?.display().to_string()]);
        }
        if let Some(sensor) = &self.sensor {
            args.extend(["-s".into(), sensor.clone()]);
        }
        Ok(args)
    }
    /// Returns the arguments as a single string with absolute paths
    pub fn to_arg_string(&self) -> Result<String> {
        Ok(self.to_args()?.join(" "))
    }
}

/// Writes `content` into a file, truncating the file or appending to it
pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str, append: bool) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| PhosimError::Write(e, path.into()))?;
    file.write_all(content.as_bytes())
        .map_err(|e| PhosimError::Write(e, path.into()))
}

/// PhoSim statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `move` statements of all the DOF (micron and arcsec)
    Dof(Vec<f64>),
    /// `izernike` statements of a surface (mm)
    Zernike(SurfaceType, Vec<f64>),
    /// `surfacemap` statement
    SurfaceMap(SurfaceType, PathBuf, i32),
    /// `surfacelink` statement
    SurfaceLink(SurfaceType, SurfaceType),
    /// `camconfig` statement
    Camera(CameraConfig),
}
impl Statement {
    /// Formats the statement
    pub fn to_phosim(&self) -> Result<String> {
        match self {
            Statement::Dof(dof) => dof_perturbation(dof),
            Statement::Zernike(surface, zk) => Ok(surface_perturbation(*surface, zk)),
            Statement::SurfaceMap(surface, path, scale) => {
                surface_map_perturbation(*surface, path, *scale)
            }
            Statement::SurfaceLink(a, b) => Ok(surface_link(*a, *b)),
            Statement::Camera(config) => Ok(camera_config(*config)),
        }
    }
}

/// Perturbation command set
///
/// The ordered statements that describe the optical state of the telescope for
/// one PhoSim run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerturbationCommandSet {
    statements: Vec<Statement>,
}
impl PerturbationCommandSet {
    pub fn new() -> Self {
        Default::default()
    }
    /// Appends a statement
    pub fn push(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement);
        self
    }
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
    pub fn len(&self) -> usize {
        self.statements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
    /// Returns the DOF of the `move` statements
    pub fn dof(&self) -> Option<&[f64]> {
        self.statements.iter().find_map(|s| match s {
            Statement::Dof(dof) => Some(dof.as_slice()),
            _ => None,
        })
    }
    /// Formats the statements
    pub fn to_phosim(&self) -> Result<String> {
        self.statements.iter().map(|s| s.to_phosim()).collect()
    }
    /// Writes the statements into a file
    pub fn write<P: AsRef<Path>>(&self, path: P, append: bool) -> Result<()> {
        write_to_file(path.as_ref(), &self.to_phosim()?, append)?;
        log::debug!("perturbations written to {:?}", path.as_ref());
        Ok(())
    }
}
impl Extend<Statement> for PerturbationCommandSet {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        self.statements.extend(iter)
    }
}
impl FromIterator<Statement> for PerturbationCommandSet {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}
