use crate::collector;
use crate::config::OrchestratorConfig;
use crate::launcher::{EmulatorLauncher, LaunchError, Launcher};
use crate::process::SessionProcess;
use crate::protocol::ArtifactSlot;
use crate::result::RunResult;
use crate::session::{SessionPhase, SessionRequest, SessionTracker};
use crate::watchdog::{self, WatchTiming};
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Orchestrator<L = EmulatorLauncher> {
    launcher: L,
    timing: WatchTiming,
    default_timeout: Duration,
    workspace_root: Option<PathBuf>,
}

impl Orchestrator<EmulatorLauncher> {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::with_launcher(EmulatorLauncher::from_config(config), config)
    }
}

impl<L: Launcher> Orchestrator<L> {
    pub fn with_launcher(launcher: L, config: &OrchestratorConfig) -> Self {
        Self {
            launcher,
            timing: WatchTiming::from_config(config),
            default_timeout: config.default_timeout(),
            workspace_root: config.workspace_root.clone(),
        }
    }

    pub fn run(&self, request: SessionRequest) -> RunResult {
        let workspace = match &self.workspace_root {
            Some(root) => Workspace::create_in(root),
            None => Workspace::create(),
        };
        match workspace {
            Ok(workspace) => self.run_in(&workspace, request),
            Err(err) => RunResult::failure(SessionError::Workspace(err).to_string()),
        }
    }

    pub fn run_in(&self, workspace: &Workspace, request: SessionRequest) -> RunResult {
        let mut tracker = SessionTracker::new();
        let result = match self.drive(workspace, &request, &mut tracker) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, phase = %tracker.phase(), "session aborted");
                RunResult::failure(err.to_string())
            }
        };
        tracing::info!(
            success = result.success,
            reason = ?result.reason,
            image = result.has_image(),
            data = result.data.is_some(),
            "session finished"
        );
        result
    }

    fn drive(
        &self,
        workspace: &Workspace,
        request: &SessionRequest,
        tracker: &mut SessionTracker,
    ) -> Result<RunResult, SessionError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let launch = request.resolve(workspace.slot_path(ArtifactSlot::Script))?;
        workspace
            .prepare(&request.script)
            .map_err(|source| LaunchError::Workspace {
                root: workspace.root().to_path_buf(),
                source,
            })?;

        let start = Instant::now();
        let mut process = self.launcher.launch(&launch, workspace)?;
        tracker.advance(SessionPhase::Launched);

        tracker.advance(SessionPhase::Watching);
        let reason = watchdog::wait(&mut process, workspace, timeout, &self.timing);

        tracker.advance(SessionPhase::Terminating);
        process.terminate();
        drop(process);

        tracker.advance(SessionPhase::Collected);
        let result = collector::collect(workspace, reason, timeout);
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "session collected");
        Ok(result)
    }
}
