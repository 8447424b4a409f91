// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::GlmError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serializes `value` as pretty JSON and writes it to `path` atomically.
///
/// The document is written to a temp file in the destination directory and
/// renamed into place, so a crash mid-write never leaves a partial artifact
/// under the final name.
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<(), GlmError> {
    let dir = path.parent().ok_or_else(|| {
        GlmError::invalid_input(format!(
            "artifact path has no parent directory: {}",
            path.display()
        ))
    })?;
    let mut staged = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut staged, value)?;
    staged.write_all(b"\n")?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| GlmError::Io(err.error))?;
    Ok(())
}
