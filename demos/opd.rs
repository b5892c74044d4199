//! Runs PhoSim once to compute the OPD of the telescope
//!
//! Environment variables:
//!  - `PHOSIM_PATH`: PhoSim installation directory
//!  - `AOCLC_CONFIG`: telescope toml configuration file
//!  - `AOCLC_OUTPUT`: output directory, default: `aoclc_opd`

use aoclc::{
    simulator::SimulatorRequest, Builder, PhoSim, Simulator, TelescopeBuilder,
};
use std::{env, fs, path::PathBuf, sync::LazyLock};

static PHOSIM_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    env::var("PHOSIM_PATH")
        .expect("PHOSIM_PATH is not set")
        .into()
});
static OUTPUT: LazyLock<PathBuf> = LazyLock::new(|| {
    env::var("AOCLC_OUTPUT")
        .unwrap_or_else(|_| "aoclc_opd".into())
        .into()
});

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let builder = match env::var("AOCLC_CONFIG") {
        Ok(config) => TelescopeBuilder::load(config)?,
        Err(_) => TelescopeBuilder::default(),
    };
    let mut telescope = builder.build()?;
    println!("{}", telescope.dof());

    let pert = OUTPUT.join("pert");
    let img = OUTPUT.join("img");
    fs::create_dir_all(&pert)?;
    fs::create_dir_all(&img)?;

    let args = telescope.write_opd_files(&pert, &img)?;
    let mut phosim = PhoSim::new(PHOSIM_PATH.as_path())?;
    let response = phosim.run(&SimulatorRequest::new(args, &img).log(pert.join("opd.log")))?;
    println!("PhoSim OPD outputs:");
    response
        .outputs
        .iter()
        .for_each(|output| println!(" - {}", output.display()));
    Ok(())
}
