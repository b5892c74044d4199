use aoclc::{
    closed_loop::{
        files, ClosedLoopError, CollaboratorError, Exposure, OpdData, OpdReport,
    },
    dof::{DofLayout, N_DOF},
    metrology::{PssnSummary, SensorFwhm, SensorWavefrontError, COMCAM_SENSORS},
    mirror::{FeaData, M1M3Builder, M2Builder, MirrorDataBuilder},
    simulator::{self, SimulatorRequest, SimulatorResponse},
    phosim::FilterType,
    telescope::Defocus,
    AoclcError, Builder, ClosedLoop, ClosedLoopConfig, CorrectionController, DofState,
    FromBuilder, LoopState, OpdAnalysis, Simulator, Telescope, WavefrontEstimator,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

fn polar_grid(ri: f64, ro: f64) -> (Vec<f64>, Vec<f64>) {
    let (n_r, n_o) = (10, 40);
    (0..n_r)
        .flat_map(|i| {
            let r = ri + (ro - ri) * i as f64 / (n_r - 1) as f64;
            (0..n_o).map(move |j| {
                let o = 2. * std::f64::consts::PI * j as f64 / n_o as f64;
                (r * o.cos(), r * o.sin())
            })
        })
        .unzip()
}

fn fea(annuli: &[(f64, f64)]) -> FeaData {
    let (x, y): (Vec<f64>, Vec<f64>) = annuli
        .iter()
        .map(|(ri, ro)| polar_grid(*ri, *ro))
        .fold((vec![], vec![]), |(mut x, mut y), (xa, ya)| {
            x.extend(xa);
            y.extend(ya);
            (x, y)
        });
    FeaData {
        zenith: x.iter().zip(&y).map(|(x, y)| 0.1 * (x * x + y * y)).collect(),
        horizon: y.iter().map(|y| 0.05 * y).collect(),
        vertical_gradient: x.iter().map(|x| 0.2 * x).collect(),
        radial_gradient: x.iter().zip(&y).map(|(x, y)| 0.3 * x.hypot(*y)).collect(),
        x,
        y,
    }
}

fn telescope() -> Telescope {
    telescope_with(FilterType::default())
}

fn telescope_with(filter: FilterType) -> Telescope {
    Telescope::builder()
        .filter(filter)
        .m1m3(M1M3Builder::default().fea_data(fea(&[(2.558, 4.18), (0.55, 2.508)])))
        .m2(M2Builder::default().fea_data(fea(&[(0.9, 1.71)])))
        .build()
        .unwrap()
}

fn output(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    dir
}

#[derive(Default)]
struct FakePhoSim {
    requests: Vec<SimulatorRequest>,
}
impl Simulator for FakePhoSim {
    fn run(&mut self, request: &SimulatorRequest) -> simulator::Result<SimulatorResponse> {
        let name = format!("output_{}.fits", self.requests.len());
        fs::write(request.output.join(name), "fits").unwrap();
        self.requests.push(request.clone());
        Ok(SimulatorResponse {
            status: 0,
            outputs: simulator::list_outputs(&request.output)?,
        })
    }
}

// PSSN improving with every analysis
#[derive(Default)]
struct FakeAnalysis {
    n_call: usize,
}
impl OpdAnalysis for FakeAnalysis {
    fn analyze(&mut self, opd: &OpdData) -> Result<OpdReport, CollaboratorError> {
        assert!(!opd.outputs.is_empty());
        self.n_call += 1;
        let pssn = 1. - 0.1 / self.n_call as f64;
        Ok(OpdReport {
            zk: vec![vec![0.1; 19]; 9],
            pssn: vec![pssn; 9],
        })
    }
}

struct FakeEstimator;
impl WavefrontEstimator for FakeEstimator {
    fn estimate(
        &mut self,
        intra: &Exposure,
        extra: &Exposure,
        sky: &Path,
    ) -> Result<Vec<SensorWavefrontError>, CollaboratorError> {
        assert_eq!(intra.defocus, Defocus::Intra);
        assert_eq!(extra.defocus, Defocus::Extra);
        assert_eq!(intra.obs_id, extra.obs_id + 1);
        assert!(sky.is_file());
        Ok(COMCAM_SENSORS
            .iter()
            .rev()
            .enumerate()
            .map(|(i, s)| SensorWavefrontError::new(s, vec![i as f64; 19]))
            .collect())
    }
}

// moves the camera by 10 micron at every iteration
#[derive(Default)]
struct FakeController {
    fwhm: Vec<SensorFwhm>,
    fail_at: Option<usize>,
    n_call: usize,
}
impl CorrectionController for FakeController {
    fn set_fwhm(&mut self, fwhm: &[SensorFwhm]) {
        self.fwhm = fwhm.to_vec();
    }
    fn correction(
        &mut self,
        wavefront: &[SensorWavefrontError],
    ) -> Result<Vec<f64>, CollaboratorError> {
        assert_eq!(wavefront.len(), 9);
        assert_eq!(self.fwhm.len(), 9);
        if self.fail_at == Some(self.n_call) {
            return Err("controller failure".into());
        }
        self.n_call += 1;
        let mut delta = vec![0f64; N_DOF];
        delta[DofLayout::CAMERA_PISTON] = 10.;
        Ok(delta)
    }
}

#[test]
fn closed_loop_iterations() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let out = output("aoclc_closed_loop_iterations");
    let config = ClosedLoopConfig::default().n_iteration(3).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope(),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController::default(),
    );
    let summary = closed_loop.run()?.clone();
    assert_eq!(closed_loop.state(), LoopState::Exhausted);

    assert_eq!(summary.iterations.len(), 3);
    let obs_ids: Vec<u64> = summary.iterations.iter().map(|i| i.obs_id).collect();
    assert_eq!(obs_ids, vec![9006000, 9006010, 9006020]);
    assert!(summary
        .iterations
        .windows(2)
        .all(|w| w[1].gq_fwhm < w[0].gq_fwhm));

    for (i, obs_id) in obs_ids.iter().enumerate() {
        let iter = out.join(format!("iter{}", i));
        let pert = iter.join(files::PERTURBATION_DIR);
        let img = iter.join(files::IMAGE_DIR);
        for file in ["OPD.cmd", "OPD.inst", "star_extra.cmd", "star_intra.inst", files::SKY, files::DOF] {
            assert!(pert.join(file).is_file(), "missing {file} in {:?}", pert);
        }
        for file in [files::OPD_ZK, files::PSSN, files::WFS_ZK] {
            assert!(img.join(file).is_file(), "missing {file} in {:?}", img);
        }
        let opd = fs::read_to_string(pert.join("OPD.inst"))?;
        assert!(opd.starts_with(&format!("Opsim_obshistid {}\n", obs_id)));
        let intra = fs::read_to_string(pert.join("star_intra.inst"))?;
        assert!(intra.starts_with(&format!("Opsim_obshistid {}\n", obs_id + 2)));
        let dof = DofState::load(pert.join(files::DOF))?;
        assert_eq!(
            dof.state()[DofLayout::CAMERA_PISTON],
            10. * (i + 1) as f64
        );
        let pssn = PssnSummary::load(img.join(files::PSSN))?;
        assert_eq!(pssn.gq_pssn, summary.iterations[i].gq_pssn);
    }

    // wavefront errors are saved in the sensor order
    let wfs = fs::read_to_string(out.join("iter0").join(files::IMAGE_DIR).join(files::WFS_ZK))?;
    assert!(wfs.starts_with("8.000000000000000000e+00"));

    assert_eq!(
        closed_loop.telescope().dof().state()[DofLayout::CAMERA_PISTON],
        30.
    );
    assert_eq!(
        fs::read_to_string(out.join(files::FWHM_ITERS))?.lines().count(),
        3
    );
    assert!(out.join(files::SUMMARY).is_file());

    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn phosim_requests() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_requests");
    let config = ClosedLoopConfig::default().n_iteration(1).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope(),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController::default(),
    );
    assert_eq!(closed_loop.step()?, LoopState::Simulating(0));
    assert_eq!(closed_loop.step()?, LoopState::Analyzing(0));
    assert_eq!(closed_loop.step()?, LoopState::Correcting(0));
    assert_eq!(closed_loop.step()?, LoopState::Exhausted);
    assert_eq!(closed_loop.step()?, LoopState::Exhausted);
    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn star_exposures_read_the_comcam_sensors() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_sensors");
    let mut telescope = telescope();
    let mut phosim = FakePhoSim::default();
    let pert = out.join("pert");
    let img = out.join("img");
    fs::create_dir_all(&pert)?;
    fs::create_dir_all(&img)?;
    let sky = aoclc::SkySim::from_opd(telescope.metrology(), 15.);
    let args = telescope.write_star_files(&pert, &img, (11, 12), &sky, "sed_flat.txt")?;
    for args in args {
        phosim.run(&SimulatorRequest::new(args, &img))?;
    }
    assert_eq!(phosim.requests.len(), 2);
    assert!(phosim
        .requests
        .iter()
        .all(|r| r.args[r.args.len() - 2..] == ["-s".to_string(), COMCAM_SENSORS.join("|")]));
    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn failed_iteration_is_reported() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_failure");
    let config = ClosedLoopConfig::default().n_iteration(3).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope(),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController {
            fail_at: Some(1),
            ..Default::default()
        },
    );
    let err = closed_loop.run().unwrap_err();
    assert!(matches!(
        err,
        AoclcError::ClosedLoop(ClosedLoopError::Iteration { iteration: 1, .. })
    ));
    assert_eq!(closed_loop.state(), LoopState::Correcting(1));
    assert_eq!(closed_loop.summary().iterations.len(), 1);
    // the DOF of the last completed iteration is kept
    let dof = DofState::load(out.join("iter0").join("pert").join(files::DOF))?;
    assert_eq!(dof.state()[DofLayout::CAMERA_PISTON], 10.);
    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn only_the_requested_iterations_are_written() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_n_iteration");
    let config = ClosedLoopConfig::default().n_iteration(2).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope(),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController::default(),
    );
    closed_loop.run()?;
    let mut iter_dirs: Vec<String> = fs::read_dir(&out)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("iter"))
        .collect();
    iter_dirs.sort();
    assert_eq!(iter_dirs, vec!["iter0", "iter1"]);
    assert_eq!(closed_loop.summary().iterations.len(), 2);
    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn failed_correction_leaves_the_state_unchanged() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_failed_correction");
    let config = ClosedLoopConfig::default().n_iteration(1).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope(),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController::default(),
    );
    while closed_loop.state() != LoopState::Correcting(0) {
        closed_loop.step()?;
    }
    // the run summary cannot be written over a directory
    let blocker = out.join(files::SUMMARY);
    fs::create_dir_all(&blocker)?;
    for _ in 0..2 {
        assert!(closed_loop.step().is_err());
        assert_eq!(closed_loop.state(), LoopState::Correcting(0));
        assert_eq!(
            closed_loop.telescope().dof().state()[DofLayout::CAMERA_PISTON],
            0.
        );
        assert!(closed_loop.summary().iterations.is_empty());
    }
    fs::remove_dir_all(&blocker)?;
    assert_eq!(closed_loop.step()?, LoopState::Exhausted);
    // the correction is applied once
    assert_eq!(
        closed_loop.telescope().dof().state()[DofLayout::CAMERA_PISTON],
        10.
    );
    assert_eq!(closed_loop.summary().iterations.len(), 1);
    let dof = DofState::load(out.join("iter0").join(files::PERTURBATION_DIR).join(files::DOF))?;
    assert_eq!(dof.state()[DofLayout::CAMERA_PISTON], 10.);
    fs::remove_dir_all(out)?;
    Ok(())
}

#[test]
fn reference_filter_run() -> anyhow::Result<()> {
    let out = output("aoclc_closed_loop_reference_filter");
    let config = ClosedLoopConfig::default().n_iteration(1).output(&out);
    let mut closed_loop = ClosedLoop::new(
        config,
        telescope_with(FilterType::Ref),
        FakePhoSim::default(),
        FakeAnalysis::default(),
        FakeEstimator,
        FakeController::default(),
    );
    closed_loop.run()?;
    let pert = out.join("iter0").join(files::PERTURBATION_DIR);
    let opd = fs::read_to_string(pert.join("OPD.inst"))?;
    assert!(opd.contains("Opsim_filter 1\n"));
    assert_eq!(opd.lines().filter(|l| l.ends_with(" 500.0 ")).count(), 9);
    let star = fs::read_to_string(pert.join("star_extra.inst"))?;
    assert!(star.contains("Opsim_filter 1\n"));
    fs::remove_dir_all(out)?;
    Ok(())
}
