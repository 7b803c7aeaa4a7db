// File-level helpers for save conversion.
//
// Saves are small (a few MiB at most), so input is read whole and output
// is buffered in memory. The output only reaches its destination through
// `write_atomic`: a temp file next to the destination that is persisted
// into place once fully written, and removed on every other path.
// SHA-256 digests are feature-gated behind `file-io`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::engine::ConvertError;
use crate::format::SaveFormat;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn read_input(path: &Path) -> Result<Vec<u8>, ConvertError> {
    let data = fs::read(path)?;
    debug!("read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

// ---------------------------------------------------------------------------
// Output paths
// ---------------------------------------------------------------------------

/// `<input-file-name>.<target>` next to the input.
pub fn default_output_path(input: &Path, target: SaveFormat) -> PathBuf {
    let mut name = input.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(target.as_str());
    input.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Atomic write
// ---------------------------------------------------------------------------

/// Write `data` to `path` through a temp file in the same directory.
///
/// With `overwrite == false` an existing destination is left untouched and
/// the call fails.
pub fn write_atomic(path: &Path, data: &[u8], overwrite: bool) -> Result<(), ConvertError> {
    let persist_err = |source: std::io::Error| ConvertError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(persist_err)?;
    tmp.write_all(data).map_err(persist_err)?;
    tmp.flush().map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;

    let persisted = if overwrite {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map_err(|e| persist_err(e.error))?;
    debug!("wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
pub fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    use sha2::{Digest, Sha256};
    Some(Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
pub fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
