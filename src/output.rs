//! Persisting the rendered digest.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WriteError;

/// Replace `path` with `contents`.
///
/// The bytes go to a hidden sibling file first and are renamed into place,
/// so readers see either the previous digest or the new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    let tmp = temp_sibling(path);
    let fail = |source| WriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(fail(e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        fail(e)
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "digest".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
