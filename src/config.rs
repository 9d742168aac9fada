/// Verifier configuration.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Ticks a replay may run past its recorded length before it is cut off.
    pub bonus_ticks: u64,
    pub workers: usize,
    pub log_filter: String,
    /// Directory for per-level snapshot JSON; `None` skips writing.
    pub snapshot_output: Option<PathBuf>,
    pub levels_dir: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    verifier: TomlVerifier,
    #[serde(default)]
    levels: TomlLevels,
}

#[derive(Deserialize, Debug)]
struct TomlVerifier {
    #[serde(default = "default_bonus_ticks")]
    bonus_ticks: u64,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default = "default_log_filter")]
    log_filter: String,
    #[serde(default)]
    snapshot_output: String,
}

#[derive(Deserialize, Debug)]
struct TomlLevels {
    #[serde(default = "default_levels_dir")]
    dir: String,
}

// ── Defaults ──

fn default_bonus_ticks() -> u64 { 200 }
fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
fn default_log_filter() -> String { "info".into() }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlVerifier {
    fn default() -> Self {
        TomlVerifier {
            bonus_ticks: default_bonus_ticks(),
            workers: default_workers(),
            log_filter: default_log_filter(),
            snapshot_output: String::new(),
        }
    }
}

impl Default for TomlLevels {
    fn default() -> Self {
        TomlLevels { dir: default_levels_dir() }
    }
}

// ── Loading ──

impl VerifierConfig {
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parses `text` as a config file, relative paths resolved against `base`.
    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, &[base.to_path_buf()]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_dir(&toml_cfg.levels.dir, search_dirs);
        let snapshot_output = match toml_cfg.verifier.snapshot_output.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };
        VerifierConfig {
            bonus_ticks: toml_cfg.verifier.bonus_ticks,
            workers: toml_cfg.verifier.workers.max(1),
            log_filter: toml_cfg.verifier.log_filter,
            snapshot_output,
            levels_dir,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Absolute paths are kept; relative ones take the first candidate where
/// the directory exists, else stay relative to CWD.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs.iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config.toml parse error, using defaults");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config.toml");
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = VerifierConfig::from_toml_str("", Path::new("/nonexistent")).expect("parse");
        assert_eq!(cfg.bonus_ticks, 200);
        assert_eq!(cfg.log_filter, "info");
        assert!(cfg.workers >= 1);
        assert!(cfg.snapshot_output.is_none());
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn keys_override_independently() {
        let text = "[verifier]\nbonus_ticks = 5\nworkers = 0\nsnapshot_output = \"out\"\n\n[levels]\ndir = \"/srv/levels\"\n";
        let cfg = VerifierConfig::from_toml_str(text, Path::new(".")).expect("parse");
        assert_eq!(cfg.bonus_ticks, 5);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.snapshot_output, Some(PathBuf::from("out")));
        assert_eq!(cfg.levels_dir, PathBuf::from("/srv/levels"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(VerifierConfig::from_toml_str("[verifier\n", Path::new(".")).is_err());
        assert!(VerifierConfig::from_toml_str("[verifier]\nbonus_ticks = \"many\"\n", Path::new(".")).is_err());
    }

    #[test]
    fn relative_levels_dir_found_in_candidates() {
        let base = std::env::temp_dir().join(format!("tickgrid-config-{}", std::process::id()));
        std::fs::create_dir_all(base.join("packs")).expect("mkdir");
        let cfg = VerifierConfig::from_toml_str("[levels]\ndir = \"packs\"\n", &base).expect("parse");
        assert_eq!(cfg.levels_dir, base.join("packs"));
        std::fs::remove_dir_all(&base).ok();
    }
}
