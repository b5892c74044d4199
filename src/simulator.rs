//!
//! # External simulator
//!
//! The optical simulator is a blocking external call: a request made of the argument
//! string of the simulator and of the output directory, and a response made of the
//! exit status and of the content of the output directory.
//! [`PhoSim`] runs PhoSim as a subprocess; test doubles implement [`Simulator`].

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("simulator not found: {0}")]
    Missing(PathBuf),
    #[error("cannot launch the simulator {1}")]
    Launch(#[source] std::io::Error, String),
    #[error("the simulator exits with status {status:?}: {stderr}")]
    Exit { status: Option<i32>, stderr: String },
    #[error("cannot read the simulator output directory {1}")]
    Output(#[source] std::io::Error, PathBuf),
    #[error("cannot write the simulator log {1}")]
    Log(#[source] std::io::Error, PathBuf),
}
pub type Result<T> = std::result::Result<T, SimulatorError>;

/// Simulator request
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorRequest {
    /// simulator command line arguments
    pub args: Vec<String>,
    /// simulator output directory
    pub output: PathBuf,
    /// log file of the simulator standard output and error
    pub log: Option<PathBuf>,
}
impl SimulatorRequest {
    pub fn new<P: Into<PathBuf>>(args: Vec<String>, output: P) -> Self {
        Self {
            args,
            output: output.into(),
            log: None,
        }
    }
    pub fn log<P: Into<PathBuf>>(self, log: P) -> Self {
        Self {
            log: Some(log.into()),
            ..self
        }
    }
}

/// Simulator response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorResponse {
    pub status: i32,
    /// files in the output directory
    pub outputs: Vec<PathBuf>,
}

/// Lists the files of a directory, sorted by name
pub fn list_outputs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut outputs = fs::read_dir(dir)
        .map_err(|e| SimulatorError::Output(e, dir.into()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()
        .map_err(|e| SimulatorError::Output(e, dir.into()))?;
    outputs.sort();
    Ok(outputs)
}

/// Optical simulator interface
pub trait Simulator {
    /// Runs the simulator and blocks until it returns
    fn run(&mut self, request: &SimulatorRequest) -> Result<SimulatorResponse>;
}

/// PhoSim subprocess
///
/// Runs `<interpreter> <phosim dir>/phosim.py <args>` from within the PhoSim directory
#[derive(Debug, Clone)]
pub struct PhoSim {
    dir: PathBuf,
    interpreter: String,
}
impl PhoSim {
    /// Creates a new PhoSim subprocess from the PhoSim installation directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        let script = dir.join("phosim.py");
        if !script.is_file() {
            return Err(SimulatorError::Missing(script));
        }
        Ok(Self {
            dir,
            interpreter: "python".into(),
        })
    }
    /// Sets the interpreter of the PhoSim script
    pub fn interpreter(self, interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.into(),
            ..self
        }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
impl Simulator for PhoSim {
    fn run(&mut self, request: &SimulatorRequest) -> Result<SimulatorResponse> {
        log::info!("running PhoSim {}", request.args.join(" "));
        let output = Command::new(&self.interpreter)
            .arg(self.dir.join("phosim.py"))
            .args(&request.args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| SimulatorError::Launch(e, self.interpreter.clone()))?;
        if let Some(path) = &request.log {
            let mut log = output.stdout.clone();
            log.extend_from_slice(&output.stderr);
            fs::write(path, log).map_err(|e| SimulatorError::Log(e, path.clone()))?;
        }
        if !output.status.success() {
            return Err(SimulatorError::Exit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(SimulatorResponse {
            status: output.status.code().unwrap_or_default(),
            outputs: list_outputs(&request.output)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_phosim() {
        assert!(matches!(
            PhoSim::new("/no/such/phosim"),
            Err(SimulatorError::Missing(_))
        ));
    }

    #[cfg(unix)]
    fn fake_phosim(name: &str, script: &str) -> PhoSim {
        let dir = std::env::temp_dir().join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("phosim.py"), script).unwrap();
        PhoSim::new(dir).unwrap().interpreter("sh")
    }

    #[cfg(unix)]
    #[test]
    fn run_and_list_outputs() -> anyhow::Result<()> {
        let mut phosim = fake_phosim(
            "aoclc_fake_phosim_ok",
            "mkdir -p \"$3\"\necho opd > \"$3/opd_0.fits.gz\"\necho done\n",
        );
        let output = std::env::temp_dir().join("aoclc_fake_phosim_ok_output");
        let log = std::env::temp_dir().join("aoclc_fake_phosim_ok.log");
        let request = SimulatorRequest::new(
            vec!["inst".into(), "-o".into(), output.display().to_string()],
            &output,
        )
        .log(&log);
        let response = phosim.run(&request)?;
        assert_eq!(response.status, 0);
        assert_eq!(response.outputs, vec![output.join("opd_0.fits.gz")]);
        assert_eq!(fs::read_to_string(&log)?, "done\n");
        fs::remove_dir_all(output)?;
        fs::remove_file(log)?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failure_is_reported() {
        let mut phosim = fake_phosim("aoclc_fake_phosim_err", "echo boom >&2\nexit 3\n");
        let request = SimulatorRequest::new(vec!["inst".into()], "/no/such/output");
        assert!(matches!(
            phosim.run(&request),
            Err(SimulatorError::Exit {
                status: Some(3),
                ..
            })
        ));
    }
}
