use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_EMULATOR: &str = "mgba-qt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub emulator: String,
    pub display_wrapper: Vec<String>,
    pub extra_args: Vec<String>,
    pub workspace_root: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub recheck_delay_ms: u64,
    pub grace_period_ms: u64,
    pub timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            emulator: DEFAULT_EMULATOR.to_string(),
            display_wrapper: vec!["xvfb-run".to_string(), "-a".to_string()],
            extra_args: vec!["-l".to_string(), "0".to_string()],
            workspace_root: None,
            poll_interval_ms: 100,
            settle_delay_ms: 100,
            recheck_delay_ms: 50,
            grace_period_ms: 200,
            timeout_secs: 30,
        }
    }
}

impl OrchestratorConfig {
    pub fn parse(toml_src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_src)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&src)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(emulator) = env::var("GBPROBE_EMULATOR") {
            if !emulator.trim().is_empty() {
                self.emulator = emulator.trim().to_string();
            }
        }
        if let Ok(wrapper) = env::var("GBPROBE_DISPLAY_WRAPPER") {
            self.display_wrapper = wrapper.split_whitespace().map(str::to_string).collect();
        }
        if let Ok(value) = env::var("GBPROBE_TIMEOUT_SECS") {
            self.timeout_secs = value.trim().parse().map_err(|_| ConfigError::Env {
                name: "GBPROBE_TIMEOUT_SECS",
                value,
            })?;
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn recheck_delay(&self) -> Duration {
        Duration::from_millis(self.recheck_delay_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
