//! File-based completion protocol shared by the orchestrator and injected scripts.
//!
//! The injected script decides when a session is done. At that moment it writes
//! its structured output (`output.json`) and/or its image (`screenshot.png`)
//! and only then creates the marker file (`DONE`). The marker's existence is the
//! orchestrator's sole completion signal; its content is ignored. Scripts run
//! with the workspace as their working directory, so all names are relative.

use serde::Serialize;
use std::fmt;

pub const SCRIPT_FILE: &str = "script.lua";
pub const MARKER_FILE: &str = "DONE";
pub const IMAGE_FILE: &str = "screenshot.png";
pub const OUTPUT_FILE: &str = "output.json";
pub const STDOUT_FILE: &str = "stdout.log";
pub const STDERR_FILE: &str = "stderr.log";

pub const AUDIO_DRIVER_VAR: &str = "SDL_AUDIODRIVER";
pub const AUDIO_DRIVER_VALUE: &str = "dummy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSlot {
    Script,
    Marker,
    Image,
    Output,
    Stdout,
    Stderr,
}

impl ArtifactSlot {
    pub const ALL: [ArtifactSlot; 6] = [
        ArtifactSlot::Script,
        ArtifactSlot::Marker,
        ArtifactSlot::Image,
        ArtifactSlot::Output,
        ArtifactSlot::Stdout,
        ArtifactSlot::Stderr,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactSlot::Script => SCRIPT_FILE,
            ArtifactSlot::Marker => MARKER_FILE,
            ArtifactSlot::Image => IMAGE_FILE,
            ArtifactSlot::Output => OUTPUT_FILE,
            ArtifactSlot::Stdout => STDOUT_FILE,
            ArtifactSlot::Stderr => STDERR_FILE,
        }
    }
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
