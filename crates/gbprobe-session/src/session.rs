use crate::launcher::{LaunchError, LaunchRequest};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub rom_path: PathBuf,
    pub savestate_path: Option<PathBuf>,
    pub script: String,
    pub timeout: Option<Duration>,
}

impl SessionRequest {
    pub fn new(rom_path: impl Into<PathBuf>, script: impl Into<String>) -> Self {
        Self {
            rom_path: rom_path.into(),
            savestate_path: None,
            script: script.into(),
            timeout: None,
        }
    }

    pub fn with_savestate(mut self, savestate_path: Option<PathBuf>) -> Self {
        self.savestate_path = savestate_path;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn resolve(&self, script_path: PathBuf) -> Result<LaunchRequest, LaunchError> {
        let rom_path = resolve_input("rom", &self.rom_path)?;
        let savestate_path = self
            .savestate_path
            .as_deref()
            .map(|path| resolve_input("savestate", path))
            .transpose()?;
        Ok(LaunchRequest {
            rom_path,
            savestate_path,
            script_path,
        })
    }
}

fn resolve_input(role: &'static str, path: &Path) -> Result<PathBuf, LaunchError> {
    let absolute = std::path::absolute(path).map_err(|_| LaunchError::MissingInput {
        role,
        path: path.to_path_buf(),
    })?;
    if !absolute.is_file() {
        return Err(LaunchError::MissingInput {
            role,
            path: absolute,
        });
    }
    Ok(absolute)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Created,
    Launched,
    Watching,
    Terminating,
    Collected,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Created => "created",
            SessionPhase::Launched => "launched",
            SessionPhase::Watching => "watching",
            SessionPhase::Terminating => "terminating",
            SessionPhase::Collected => "collected",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct SessionTracker {
    phase: SessionPhase,
    history: Vec<SessionPhase>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Created,
            history: vec![SessionPhase::Created],
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn history(&self) -> &[SessionPhase] {
        &self.history
    }

    pub fn advance(&mut self, next: SessionPhase) {
        debug_assert!(
            next as u8 == self.phase as u8 + 1,
            "session phase {} cannot follow {}",
            next,
            self.phase
        );
        tracing::debug!(from = %self.phase, to = %next, "session phase");
        self.phase = next;
        self.history.push(next);
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
