use crate::result::{format_timeout, RunResult};
use crate::screenshot::validate_png;
use crate::watchdog::CompletionReason;
use crate::workspace::Workspace;
use std::time::Duration;

// Reads back a terminated session's artifacts and classifies the outcome.
// Must only run after the process group has been terminated.
pub fn collect(workspace: &Workspace, reason: CompletionReason, timeout: Duration) -> RunResult {
    let collected = workspace.collect();

    let image = match collected.image {
        Some(bytes) => match validate_png(&bytes) {
            Ok(info) => {
                tracing::debug!(width = info.width, height = info.height, "image accepted");
                Some(bytes)
            }
            Err(err) => {
                tracing::warn!(error = %err, size = bytes.len(), "discarding captured image");
                None
            }
        },
        None => None,
    };

    let marker = collected.marker || reason == CompletionReason::MarkerObserved;
    let success = image.is_some() || collected.output.is_some() || marker;

    if success {
        return RunResult {
            success: true,
            image,
            data: collected.output,
            stdout: collected.stdout,
            error: None,
            reason: Some(reason),
            artifacts: collected.records,
        };
    }

    let mut error = format!(
        "emulator timed out after {} without producing output",
        format_timeout(timeout)
    );
    if reason == CompletionReason::ProcessExited {
        error.push_str(" (emulator exited before signalling completion)");
    }
    RunResult {
        success: false,
        image: None,
        data: None,
        stdout: collected.stdout,
        error: Some(error),
        reason: Some(reason),
        artifacts: collected.records,
    }
}
