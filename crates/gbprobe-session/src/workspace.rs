use crate::protocol::ArtifactSlot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "gbprobe-";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    temp: Option<TempDir>,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed {slot}: {source}")]
pub struct OutputParseError {
    pub slot: ArtifactSlot,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub slot: ArtifactSlot,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Default)]
pub struct CollectedArtifacts {
    pub marker: bool,
    pub image: Option<Vec<u8>>,
    pub output: Option<serde_json::Value>,
    pub stdout: Option<String>,
    pub records: Vec<ArtifactRecord>,
}

impl Workspace {
    pub fn create() -> io::Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        Ok(Self::from_temp(temp))
    }

    pub fn create_in(parent: &Path) -> io::Result<Self> {
        fs::create_dir_all(parent)?;
        let temp = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self::from_temp(temp))
    }

    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = fs::canonicalize(&root)?;
        Ok(Self { root, temp: None })
    }

    fn from_temp(temp: TempDir) -> Self {
        Self {
            root: temp.path().to_path_buf(),
            temp: Some(temp),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, slot: ArtifactSlot) -> PathBuf {
        self.root.join(slot.file_name())
    }

    pub fn prepare(&self, script: &str) -> io::Result<PathBuf> {
        for slot in ArtifactSlot::ALL {
            remove_if_present(&self.slot_path(slot))?;
        }
        let script_path = self.slot_path(ArtifactSlot::Script);
        fs::write(&script_path, script)?;
        Ok(script_path)
    }

    pub fn has_marker(&self) -> bool {
        self.slot_path(ArtifactSlot::Marker).is_file()
    }

    pub fn image_len(&self) -> Option<u64> {
        fs::metadata(self.slot_path(ArtifactSlot::Image))
            .ok()
            .map(|meta| meta.len())
    }

    pub fn read_slot(&self, slot: ArtifactSlot) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.slot_path(slot)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn collect(&self) -> CollectedArtifacts {
        let mut collected = CollectedArtifacts {
            marker: self.has_marker(),
            ..CollectedArtifacts::default()
        };

        for slot in [
            ArtifactSlot::Marker,
            ArtifactSlot::Image,
            ArtifactSlot::Output,
            ArtifactSlot::Stdout,
        ] {
            let bytes = match self.read_slot(slot) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(slot = %slot, error = %err, "artifact unreadable");
                    continue;
                }
            };
            collected.records.push(ArtifactRecord {
                slot,
                size: bytes.len() as u64,
                sha256: sha256_hex(&bytes),
            });
            match slot {
                ArtifactSlot::Image => collected.image = Some(bytes),
                ArtifactSlot::Stdout => {
                    let text = String::from_utf8_lossy(&bytes).trim_end().to_string();
                    if !text.is_empty() {
                        collected.stdout = Some(text);
                    }
                }
                ArtifactSlot::Output => match serde_json::from_slice(&bytes) {
                    Ok(value) => collected.output = Some(value),
                    Err(source) => {
                        let err = OutputParseError { slot, source };
                        tracing::error!(error = %err, "ignoring structured output");
                    }
                },
                _ => {}
            }
        }

        collected
    }

    pub fn cleanup(self) -> io::Result<()> {
        match self.temp {
            Some(temp) => temp.close(),
            None => fs::remove_dir_all(&self.root),
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
