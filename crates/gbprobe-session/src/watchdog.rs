use crate::config::OrchestratorConfig;
use crate::process::SessionProcess;
use crate::workspace::Workspace;
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    MarkerObserved,
    ProcessExited,
    TimedOut,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::MarkerObserved => f.write_str("marker_observed"),
            CompletionReason::ProcessExited => f.write_str("process_exited"),
            CompletionReason::TimedOut => f.write_str("timed_out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTiming {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub recheck_delay: Duration,
}

impl WatchTiming {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            recheck_delay: config.recheck_delay(),
        }
    }
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

/// Polls for the completion marker, then for natural exit, until `timeout`.
/// Never waits on the process itself, so it returns no later than
/// `timeout + poll_interval` (plus settle delays after a marker).
pub fn wait<P>(
    process: &mut P,
    workspace: &Workspace,
    timeout: Duration,
    timing: &WatchTiming,
) -> CompletionReason
where
    P: SessionProcess + ?Sized,
{
    let start = Instant::now();
    let mut polls: u64 = 0;
    loop {
        polls += 1;
        if workspace.has_marker() {
            settle(workspace, timing);
            return finish(CompletionReason::MarkerObserved, start, polls);
        }
        if process.has_exited() {
            return finish(CompletionReason::ProcessExited, start, polls);
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return finish(CompletionReason::TimedOut, start, polls);
        }
        thread::sleep(timing.poll_interval.min(timeout - elapsed));
    }
}

fn finish(reason: CompletionReason, start: Instant, polls: u64) -> CompletionReason {
    tracing::info!(
        %reason,
        polls,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "watch finished"
    );
    reason
}

// The marker may land while the target is still flushing the image.
fn settle(workspace: &Workspace, timing: &WatchTiming) {
    thread::sleep(timing.settle_delay);
    let Some(size) = workspace.image_len() else {
        return;
    };
    thread::sleep(timing.recheck_delay);
    let resized = workspace.image_len();
    if resized != Some(size) {
        tracing::debug!(before = size, after = ?resized, "image still growing, settling again");
        thread::sleep(timing.settle_delay);
    }
}
