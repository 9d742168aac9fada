/// Headless replay verifier.
///
/// Usage: `tickgrid [--config FILE] [LEVELS_DIR]`
///
/// Every `<name>.toml` level in the directory is paired with `<name>.json`
/// next to it and played through on a worker thread. Levels without a
/// replay are skipped. Exits non-zero when any replay fails to win.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tickgrid::config::VerifierConfig;
use tickgrid::sim::level::GameState;
use tickgrid::sim::loader::{self, LevelError};
use tickgrid::sim::replay::{self, Outcome, Replay, ReplayError, SimulateError};
use tickgrid::sim::save;

#[derive(Debug, Error)]
enum VerifyError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("bad config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("unknown argument {0}")]
    Usage(String),
    #[error("worker {0} panicked before reporting")]
    WorkerPanicked(usize),
}

impl From<SimulateError> for VerifyError {
    fn from(e: SimulateError) -> Self {
        match e {
            SimulateError::Level(e) => VerifyError::Level(e),
            SimulateError::Replay(e) => VerifyError::Replay(e),
        }
    }
}

// ── Command line ──

struct Args {
    config: Option<PathBuf>,
    levels_dir: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, VerifyError> {
    let mut parsed = Args { config: None, levels_dir: None };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => return Err(VerifyError::Usage(arg)),
            },
            s if s.starts_with("--") => return Err(VerifyError::Usage(arg)),
            _ if parsed.levels_dir.is_none() => parsed.levels_dir = Some(PathBuf::from(arg)),
            _ => return Err(VerifyError::Usage(arg)),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<VerifierConfig, VerifyError> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|source| VerifyError::Io { path: path.clone(), source })?;
            let base = path.parent().unwrap_or(Path::new("."));
            VerifierConfig::from_toml_str(&text, base)?
        }
        None => VerifierConfig::load(),
    };
    if let Some(dir) = &args.levels_dir {
        cfg.levels_dir = dir.clone();
    }
    Ok(cfg)
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

// ── Verification ──

struct Report {
    name: String,
    result: Result<Outcome, VerifyError>,
}

impl Report {
    fn passed(&self) -> bool {
        matches!(&self.result, Ok(o) if o.state == GameState::Won)
    }
}

#[inline]
fn replay_path(level: &Path) -> PathBuf {
    level.with_extension("json")
}

#[inline]
fn level_name(path: &Path) -> String {
    path.file_stem().unwrap_or_default().to_string_lossy().into_owned()
}

fn verify_one(level_path: &Path, cfg: &VerifierConfig) -> Result<Outcome, VerifyError> {
    let desc = loader::from_file(level_path)?;
    let replay = Replay::from_file(&replay_path(level_path))?;
    let ticks = replay.cursor()?.total_ticks();
    let max_subticks = (ticks + cfg.bonus_ticks) * 3;
    let sim = replay::simulate(&desc, &replay, max_subticks)?;

    if let Some(dir) = &cfg.snapshot_output {
        let stem = level_path.file_stem().unwrap_or_default();
        let out = dir.join(stem).with_extension("json");
        let json = save::capture(&sim.level).to_json()?;
        std::fs::create_dir_all(dir).map_err(|source| VerifyError::Io { path: dir.clone(), source })?;
        std::fs::write(&out, json).map_err(|source| VerifyError::Io { path: out.clone(), source })?;
    }
    Ok(sim.outcome)
}

/// Jobs owned by worker `w` of `workers`, with their indices.
fn share(jobs: &[PathBuf], w: usize, workers: usize) -> impl Iterator<Item = (usize, &PathBuf)> {
    jobs.iter().enumerate().skip(w).step_by(workers)
}

/// A worker's reports, or one failed report per owned job if it panicked.
fn collect_worker(
    joined: std::thread::Result<Vec<(usize, Report)>>,
    jobs: &[PathBuf],
    w: usize,
    workers: usize,
) -> Vec<(usize, Report)> {
    match joined {
        Ok(reports) => reports,
        Err(_) => {
            error!(worker = w, "worker thread panicked");
            share(jobs, w, workers)
                .map(|(i, path)| (i, Report { name: level_name(path), result: Err(VerifyError::WorkerPanicked(w)) }))
                .collect()
        }
    }
}

/// Runs every job on `cfg.workers` scoped threads; reports come back in
/// job order, one per job.
fn verify_all(jobs: &[PathBuf], cfg: &VerifierConfig) -> Vec<Report> {
    let workers = cfg.workers.clamp(1, jobs.len().max(1));
    let mut indexed: Vec<(usize, Report)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                scope.spawn(move || {
                    share(jobs, w, workers)
                        .map(|(i, path)| (i, Report { name: level_name(path), result: verify_one(path, cfg) }))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .flat_map(|(w, h)| collect_worker(h.join(), jobs, w, workers))
            .collect()
    });
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}

/// Every one of `expected` jobs reported and won.
fn all_won(reports: &[Report], expected: usize) -> bool {
    reports.len() == expected && reports.iter().all(Report::passed)
}

fn print_report(report: &Report) {
    match &report.result {
        Ok(o) => println!(
            "{:<24} {:?} after {} ticks, {} subticks left, {} bonus, {} glitches",
            report.name,
            o.state,
            o.ticks,
            o.time_left,
            o.bonus_points,
            o.glitches.len(),
        ),
        Err(e) => println!("{:<24} error: {e}", report.name),
    }
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("usage: tickgrid [--config FILE] [LEVELS_DIR]");
            return ExitCode::from(2);
        }
    };
    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&cfg.log_filter);

    let jobs: Vec<PathBuf> = loader::scan_dir(&cfg.levels_dir)
        .into_iter()
        .filter(|p| {
            let found = replay_path(p).is_file();
            if !found {
                warn!(level = %p.display(), "no replay, skipped");
            }
            found
        })
        .collect();
    info!(dir = %cfg.levels_dir.display(), levels = jobs.len(), workers = cfg.workers, "verifying");

    let reports = verify_all(&jobs, &cfg);
    reports.iter().for_each(print_report);
    let passed = reports.iter().filter(|r| r.passed()).count();
    println!("{passed}/{} replays won", jobs.len());

    if all_won(&reports, jobs.len()) { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tickgrid-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    fn config_for(dir: &Path) -> VerifierConfig {
        VerifierConfig { workers: 2, levels_dir: dir.to_path_buf(), ..VerifierConfig::default() }
    }

    #[test]
    fn args_accept_config_and_dir() {
        let args = parse_args(["--config", "c.toml", "lv"].into_iter().map(String::from)).expect("args");
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert_eq!(args.levels_dir, Some(PathBuf::from("lv")));
        assert!(matches!(parse_args(["--fast"].into_iter().map(String::from)), Err(VerifyError::Usage(_))));
        assert!(matches!(parse_args(["--config"].into_iter().map(String::from)), Err(VerifyError::Usage(_))));
    }

    #[test]
    fn verifies_a_directory_in_order() {
        let dir = scratch("verify");
        let level = "diagram = [\"@.E\"]\n\n[legend]\n\"@\" = \"floor chip:r\"\n";
        std::fs::write(dir.join("a_walk.toml"), level).expect("write");
        std::fs::write(dir.join("a_walk.json"), r#"{ "inputs": [2, 8] }"#).expect("write");
        std::fs::write(dir.join("b_idle.toml"), level).expect("write");
        std::fs::write(dir.join("b_idle.json"), r#"{ "inputs": [0, 2] }"#).expect("write");
        std::fs::write(dir.join("c_broken.toml"), level).expect("write");
        std::fs::write(dir.join("c_broken.json"), r#"{ "inputs": [2] }"#).expect("write");

        let cfg = VerifierConfig { bonus_ticks: 4, ..config_for(&dir) };
        let reports = verify_all(&loader::scan_dir(&dir), &cfg);
        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a_walk", "b_idle", "c_broken"]);
        assert!(reports[0].passed());
        assert!(matches!(&reports[1].result, Ok(o) if o.state == GameState::Playing && o.ticks == 6));
        assert!(matches!(&reports[2].result, Err(VerifyError::Replay(ReplayError::OddLength(1)))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn panicked_worker_fails_its_share() {
        let jobs: Vec<PathBuf> = ["a.toml", "b.toml", "c.toml"].into_iter().map(PathBuf::from).collect();
        let joined: std::thread::Result<Vec<(usize, Report)>> = Err(Box::new("boom"));
        let reports = collect_worker(joined, &jobs, 0, 2);
        let owned: Vec<(usize, &str)> = reports.iter().map(|(i, r)| (*i, r.name.as_str())).collect();
        assert_eq!(owned, [(0, "a"), (2, "c")]);
        assert!(reports.iter().all(|(_, r)| matches!(r.result, Err(VerifyError::WorkerPanicked(0)))));

        assert!(all_won(&[], 0));
        assert!(!all_won(&[], 3));
        let failed: Vec<Report> = reports.into_iter().map(|(_, r)| r).collect();
        assert!(!all_won(&failed, 2));
    }

    #[test]
    fn writes_snapshots_when_configured() {
        let dir = scratch("snap");
        std::fs::write(dir.join("walk.toml"), "diagram = [\"@E\"]\n\n[legend]\n\"@\" = \"floor chip:r\"\n")
            .expect("write");
        std::fs::write(dir.join("walk.json"), r#"{ "inputs": [2, 4] }"#).expect("write");
        let out = dir.join("out");
        let cfg = VerifierConfig { snapshot_output: Some(out.clone()), ..config_for(&dir) };
        let outcome = verify_one(&dir.join("walk.toml"), &cfg).expect("verify");
        assert_eq!(outcome.state, GameState::Won);
        let json = std::fs::read_to_string(out.join("walk.json")).expect("snapshot");
        assert!(json.contains("\"Won\""));
        std::fs::remove_dir_all(&dir).ok();
    }
}
