use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

const REAP_POLL: Duration = Duration::from_millis(10);

pub trait SessionProcess {
    fn has_exited(&mut self) -> bool;

    // Idempotent; failures are logged and swallowed.
    fn terminate(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum TerminationError {
    #[error("signal {signal} to process group {pgid} failed: {reason}")]
    Signal {
        signal: &'static str,
        pgid: u32,
        reason: String,
    },
    #[error("direct kill of pid {pid} failed: {source}")]
    Kill {
        pid: u32,
        source: std::io::Error,
    },
    #[error("pid {pid} not reaped within {waited_ms} ms")]
    Reap { pid: u32, waited_ms: u128 },
}

// The launcher calls setsid, so the group id equals the child's pid.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    grace_period: Duration,
    exited: bool,
    terminated: bool,
}

impl ProcessHandle {
    pub(crate) fn new(child: Child, grace_period: Duration) -> Self {
        Self {
            child,
            grace_period,
            exited: false,
            terminated: false,
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn process_group(&self) -> u32 {
        self.child.id()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn reap(&mut self) -> Result<(), TerminationError> {
        let start = Instant::now();
        let budget = self.grace_period.max(REAP_POLL);
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(pid = self.pid(), %status, "target reaped");
                    self.exited = true;
                    return Ok(());
                }
                Ok(None) if start.elapsed() < budget => thread::sleep(REAP_POLL),
                Ok(None) => {
                    return Err(TerminationError::Reap {
                        pid: self.pid(),
                        waited_ms: start.elapsed().as_millis(),
                    })
                }
                Err(err) => {
                    tracing::debug!(pid = self.pid(), error = %err, "reap failed");
                    return Ok(());
                }
            }
        }
    }
}

impl SessionProcess for ProcessHandle {
    fn has_exited(&mut self) -> bool {
        if self.exited {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(pid = self.pid(), %status, "target exited on its own");
                self.exited = true;
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(pid = self.pid(), error = %err, "liveness check failed");
                self.exited = true;
                true
            }
        }
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        let pgid = self.process_group();

        // Once the leader is reaped its pid may be reused. An empty group is
        // left alone; a group emptied and reused between the liveness check
        // and the signal is a known race.
        if self.exited && !group_alive(pgid) {
            tracing::debug!(pgid, "process group already gone");
        } else {
            if signal_group(pgid, GroupSignal::Terminate) {
                thread::sleep(self.grace_period);
            }
            signal_group(pgid, GroupSignal::Kill);
        }

        if let Err(source) = self.child.kill() {
            let err = TerminationError::Kill {
                pid: self.pid(),
                source,
            };
            tracing::debug!(error = %err, "ignoring kill failure");
        }
        if let Err(err) = self.reap() {
            tracing::warn!(error = %err, "termination incomplete");
        }
        tracing::info!(pid = self.pid(), pgid, "process group terminated");
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

// False when the group is already gone.
#[cfg(unix)]
fn signal_group(pgid: u32, signal: GroupSignal) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let (sig, name) = match signal {
        GroupSignal::Terminate => (Signal::SIGTERM, "SIGTERM"),
        GroupSignal::Kill => (Signal::SIGKILL, "SIGKILL"),
    };
    let Ok(raw) = i32::try_from(pgid) else {
        return false;
    };
    match killpg(Pid::from_raw(raw), sig) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(errno) => {
            let err = TerminationError::Signal {
                signal: name,
                pgid,
                reason: errno.desc().to_string(),
            };
            tracing::debug!(error = %err, "ignoring signal failure");
            false
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: u32, _signal: GroupSignal) -> bool {
    false
}

#[cfg(unix)]
fn group_alive(pgid: u32) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match i32::try_from(pgid) {
        Ok(raw) => killpg(Pid::from_raw(raw), None).is_ok(),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn group_alive(_pgid: u32) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    fn spawn_group(script: &str) -> ProcessHandle {
        let child = Command::new("sh")
            .args(["-c", script])
            .process_group(0)
            .spawn()
            .expect("spawn");
        ProcessHandle::new(child, Duration::from_millis(50))
    }

    fn wait_for_exit(process: &mut ProcessHandle) {
        let start = Instant::now();
        while !process.has_exited() {
            assert!(start.elapsed() < Duration::from_secs(5), "leader never exited");
            thread::sleep(REAP_POLL);
        }
    }

    #[test]
    fn emptied_group_is_not_signalled() {
        let mut process = spawn_group("exit 0");
        wait_for_exit(&mut process);

        assert!(!group_alive(process.process_group()));
        process.terminate();
        assert!(process.is_terminated());
    }

    #[test]
    fn orphaned_members_keep_the_group_alive() {
        let mut process = spawn_group("sleep 30 & exit 0");
        wait_for_exit(&mut process);
        let pgid = process.process_group();

        assert!(group_alive(pgid));
        let start = Instant::now();
        process.terminate();

        assert!(process.is_terminated());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
