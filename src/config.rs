use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{AnalysisError, Result};

pub const MAX_LINES: u32 = 10;

pub const ENV_ENGINE: &str = "ANALYSIS_ENGINE";
pub const ENV_DEPTH: &str = "ANALYSIS_DEPTH";
pub const ENV_LINES: &str = "ANALYSIS_LINES";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub engine_path: PathBuf,
    pub engine_args: Vec<String>,
    pub depth: u32,
    pub lines: u32,
    pub debounce_ms: u64,
    pub min_restart_ms: u64,
    /// Sent as `setoption name <key> value <value>` during the handshake.
    pub engine_options: BTreeMap<String, String>,
    pub cache_file: Option<PathBuf>,
    pub ready_timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("stockfish"),
            engine_args: Vec::new(),
            depth: 18,
            lines: 3,
            debounce_ms: 150,
            min_restart_ms: 250,
            engine_options: BTreeMap::new(),
            cache_file: None,
            ready_timeout_ms: 5_000,
        }
    }
}

fn env_parse_u32(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u32>> {
    match get(name) {
        None => Ok(None),
        Some(v) => v.trim().parse().map(Some).map_err(|_| AnalysisError::Config(format!("{name}={v} is not a number"))),
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|k| std::env::var(k).ok())
    }

    pub fn apply_env_with<F: Fn(&str) -> Option<String>>(&mut self, get: F) -> Result<()> {
        if let Some(p) = get(ENV_ENGINE) { self.engine_path = PathBuf::from(p); }
        if let Some(d) = env_parse_u32(&get, ENV_DEPTH)? { self.depth = d; }
        if let Some(l) = env_parse_u32(&get, ENV_LINES)? { self.lines = l; }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 { return Err(AnalysisError::Config("depth must be at least 1".into())); }
        if !(1..=MAX_LINES).contains(&self.lines) {
            return Err(AnalysisError::Config(format!("lines must be within 1..={MAX_LINES}")));
        }
        if self.engine_options.keys().any(|k| k.eq_ignore_ascii_case("MultiPV")) {
            return Err(AnalysisError::Config("set MultiPV through `lines`, not engine_options".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(r#"{"depth": 22, "engine_options": {"Threads": "4"}}"#).unwrap();
        assert_eq!(cfg.depth, 22);
        assert_eq!(cfg.lines, 3);
        assert_eq!(cfg.engine_options.get("Threads").map(|s| s.as_str()), Some("4"));
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = AnalysisConfig::default();
        cfg.apply_env_with(|k| match k {
            ENV_ENGINE => Some("/opt/sf".to_string()),
            ENV_LINES => Some("5".to_string()),
            _ => None,
        }).unwrap();
        assert_eq!(cfg.engine_path, PathBuf::from("/opt/sf"));
        assert_eq!(cfg.lines, 5);
        assert!(cfg.apply_env_with(|k| (k == ENV_DEPTH).then(|| "deep".to_string())).is_err());
    }

    #[test]
    fn rejects_out_of_range_lines() {
        let cfg = AnalysisConfig { lines: 11, ..AnalysisConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = AnalysisConfig { depth: 0, ..AnalysisConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
