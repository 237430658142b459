pub mod collector;
pub mod config;
pub mod launcher;
pub mod orchestrator;
pub mod process;
pub mod protocol;
pub mod result;
pub mod screenshot;
pub mod session;
pub mod watchdog;
pub mod workspace;

pub use crate::collector::collect;
pub use crate::config::{ConfigError, OrchestratorConfig};
pub use crate::launcher::{EmulatorLauncher, LaunchError, LaunchRequest, Launcher};
pub use crate::orchestrator::{Orchestrator, SessionError};
pub use crate::process::{ProcessHandle, SessionProcess, TerminationError};
pub use crate::protocol::ArtifactSlot;
pub use crate::result::RunResult;
pub use crate::screenshot::{validate_png, ImageInfo, ImageValidationError};
pub use crate::session::{SessionPhase, SessionRequest, SessionTracker};
pub use crate::watchdog::{wait, CompletionReason, WatchTiming};
pub use crate::workspace::{ArtifactRecord, CollectedArtifacts, OutputParseError, Workspace};
