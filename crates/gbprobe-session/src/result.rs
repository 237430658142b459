use crate::watchdog::CompletionReason;
use crate::workspace::ArtifactRecord;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub success: bool,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CompletionReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactRecord>,
}

impl RunResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image: None,
            data: None,
            stdout: None,
            error: Some(error.into()),
            reason: None,
            artifacts: Vec::new(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

pub fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}
