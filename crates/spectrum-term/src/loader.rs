//! File loading for ROMs, tapes and snapshots.
//!
//! All loaders return a discriminated error; `main` prints it to stderr
//! as a single line and exits non-zero without entering the run loop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use format_spectrum_tap::{TapError, TapFile};
use format_z80::{Snapshot, SnapshotError};
use thiserror::Error;

use crate::memory::{Memory, ROM_MAX};

/// Loader failure kinds.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: ROM is {len} bytes, limit is {ROM_MAX}")]
    RomTooLarge { path: PathBuf, len: usize },

    #[error("{path}: {source}")]
    Tap {
        path: PathBuf,
        #[source]
        source: TapError,
    },

    #[error("{path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoaderError> {
    fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a ROM image (up to 16 KiB) at address 0.
pub fn load_rom(memory: &Memory, path: &Path) -> Result<(), LoaderError> {
    let data = read_file(path)?;
    if data.len() > ROM_MAX {
        return Err(LoaderError::RomTooLarge {
            path: path.to_path_buf(),
            len: data.len(),
        });
    }
    memory.load(0x0000, &data);
    log::info!("loaded ROM {} ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Parse a TAP image from disk.
pub fn load_tap(path: &Path) -> Result<TapFile, LoaderError> {
    let data = read_file(path)?;
    let tap = TapFile::parse(&data).map_err(|source| LoaderError::Tap {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loaded TAP {} ({} blocks)", path.display(), tap.blocks.len());
    Ok(tap)
}

/// Parse a .z80 snapshot from disk.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, LoaderError> {
    let data = read_file(path)?;
    let snapshot = Snapshot::parse(&data).map_err(|source| LoaderError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loaded snapshot {} (PC=${:04X})", path.display(), snapshot.pc);
    Ok(snapshot)
}
