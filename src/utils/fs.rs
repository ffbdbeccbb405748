//! Destination directory and file helpers.

use std::io::Write;
use std::path::Path;

use crate::sources::SourceError;

/// Create `dir` and its parents if they do not exist yet.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Write `bytes` to `path` so readers never see a partial file.
///
/// The bytes go to a temporary file in the same directory which is then
/// renamed over `path`. Empty payloads are refused.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SourceError> {
    if bytes.is_empty() {
        return Err(SourceError::NotFound(format!(
            "Empty response for {}",
            path.display()
        )));
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| SourceError::Io(e.error))?;
    Ok(())
}

/// Whether `path` is a regular file with at least one byte.
pub fn has_content(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Remove `path`, ignoring a file that is already gone.
pub fn discard(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
