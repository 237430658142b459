use crate::config::OrchestratorConfig;
use crate::process::{ProcessHandle, SessionProcess};
use crate::protocol::{ArtifactSlot, AUDIO_DRIVER_VALUE, AUDIO_DRIVER_VAR};
use crate::workspace::Workspace;
use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("program not found: {0}")]
    NotFound(String),
    #[error("{role} path is not a file: {}", .path.display())]
    MissingInput { role: &'static str, path: PathBuf },
    #[error("{role} path must be absolute: {}", .path.display())]
    RelativePath { role: &'static str, path: PathBuf },
    #[error("prepare workspace {}: {source}", .root.display())]
    Workspace {
        root: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub rom_path: PathBuf,
    pub savestate_path: Option<PathBuf>,
    pub script_path: PathBuf,
}

pub trait Launcher {
    type Process: SessionProcess;

    fn launch(
        &self,
        request: &LaunchRequest,
        workspace: &Workspace,
    ) -> Result<Self::Process, LaunchError>;
}

#[derive(Debug, Clone)]
pub struct EmulatorLauncher {
    emulator: String,
    display_wrapper: Vec<String>,
    extra_args: Vec<String>,
    grace_period: Duration,
}

impl EmulatorLauncher {
    pub fn new(emulator: impl Into<String>) -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            emulator: emulator.into(),
            display_wrapper: Vec::new(),
            extra_args: Vec::new(),
            grace_period: defaults.grace_period(),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            emulator: config.emulator.clone(),
            display_wrapper: config.display_wrapper.clone(),
            extra_args: config.extra_args.clone(),
            grace_period: config.grace_period(),
        }
    }

    pub fn with_display_wrapper(mut self, wrapper: Vec<String>) -> Self {
        self.display_wrapper = wrapper;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn command_line(&self, request: &LaunchRequest) -> Result<Vec<OsString>, LaunchError> {
        require_absolute("rom", &request.rom_path)?;
        require_absolute("script", &request.script_path)?;
        if let Some(savestate) = &request.savestate_path {
            require_absolute("savestate", savestate)?;
        }

        let mut argv = Vec::new();
        if let Some((wrapper, wrapper_args)) = self.display_wrapper.split_first() {
            argv.push(resolve_program(wrapper)?.into_os_string());
            argv.extend(wrapper_args.iter().map(OsString::from));
        }
        argv.push(resolve_program(&self.emulator)?.into_os_string());
        argv.push(request.rom_path.clone().into_os_string());
        if let Some(savestate) = &request.savestate_path {
            argv.push("-t".into());
            argv.push(savestate.clone().into_os_string());
        }
        argv.push("--script".into());
        argv.push(request.script_path.clone().into_os_string());
        argv.extend(self.extra_args.iter().map(OsString::from));
        Ok(argv)
    }
}

impl Launcher for EmulatorLauncher {
    type Process = ProcessHandle;

    fn launch(
        &self,
        request: &LaunchRequest,
        workspace: &Workspace,
    ) -> Result<ProcessHandle, LaunchError> {
        let argv = self.command_line(request)?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LaunchError::NotFound(self.emulator.clone()))?;
        let program = PathBuf::from(program);

        let stdout = log_file(workspace, ArtifactSlot::Stdout)?;
        let stderr = log_file(workspace, ArtifactSlot::Stderr)?;

        let mut command = Command::new(&program);
        command
            .args(args)
            .current_dir(workspace.root())
            .env(AUDIO_DRIVER_VAR, AUDIO_DRIVER_VALUE)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        isolate_process_group(&mut command);

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::info!(
            pid = child.id(),
            program = %program.display(),
            workspace = %workspace.root().display(),
            "target launched"
        );
        Ok(ProcessHandle::new(child, self.grace_period))
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(|_| ())
                .map_err(std::io::Error::from)
        });
    }
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

fn log_file(workspace: &Workspace, slot: ArtifactSlot) -> Result<File, LaunchError> {
    File::create(workspace.slot_path(slot)).map_err(|source| LaunchError::Workspace {
        root: workspace.root().to_path_buf(),
        source,
    })
}

fn require_absolute(role: &'static str, path: &Path) -> Result<(), LaunchError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(LaunchError::RelativePath {
            role,
            path: path.to_path_buf(),
        })
    }
}

pub fn resolve_program(name: &str) -> Result<PathBuf, LaunchError> {
    let path = Path::new(name);
    if path.components().count() > 1 {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(LaunchError::NotFound(name.to_string()))
        };
    }
    find_on_path(name).ok_or_else(|| LaunchError::NotFound(name.to_string()))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let candidate = dir.join(format!("{name}.exe"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
