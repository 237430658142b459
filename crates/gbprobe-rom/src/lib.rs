pub mod disasm;
pub mod hexdump;
pub mod search;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub use crate::disasm::{disassemble, Instruction};
pub use crate::hexdump::hex_dump;
pub use crate::search::{parse_hex_pattern, search, SearchHit, SearchResults};

pub const MAX_WINDOW: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid hex pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("search pattern is empty")]
    EmptyPattern,
    #[error("offset 0x{offset:X} is past the end of {} ({len} bytes)", .path.display())]
    OffsetPastEnd { path: PathBuf, offset: u64, len: u64 },
}

/// Reads up to `len` bytes (capped at [`MAX_WINDOW`]) starting at `offset`.
/// The window is shorter when the file ends first. An offset exactly at the
/// end yields an empty window; one beyond it is `OffsetPastEnd` rather than
/// an empty dump.
pub fn read_window(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, RomError> {
    let io_err = |source| RomError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let file_len = file.metadata().map_err(io_err)?.len();
    if offset > file_len {
        return Err(RomError::OffsetPastEnd {
            path: path.to_path_buf(),
            offset,
            len: file_len,
        });
    }
    file.seek(SeekFrom::Start(offset)).map_err(io_err)?;

    let mut data = Vec::with_capacity(len.min(MAX_WINDOW));
    file.take(len.min(MAX_WINDOW) as u64)
        .read_to_end(&mut data)
        .map_err(io_err)?;
    Ok(data)
}

pub fn read_rom(path: &Path) -> Result<Vec<u8>, RomError> {
    std::fs::read(path).map_err(|source| RomError::Io {
        path: path.to_path_buf(),
        source,
    })
}
