//! Atomic file replacement (temp file + rename)

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling temp path: `state.json` -> `state.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` so readers never observe a partial file.
///
/// Parent directories are created as needed. Every failure is reported as
/// [`Error::Persistence`].
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let persistence = |e: std::io::Error| Error::Persistence {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persistence)?;
    }

    let tmp = temp_path(path);
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(persistence(e));
    }

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file atomically");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents_and_cleans_temp() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("state.json");

        write_atomic(&target, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
        assert!(!temp_dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("state.json");

        write_atomic(&target, b"old").unwrap();
        write_atomic(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_atomic_write_failure_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be replaced by a file
        let target = temp_dir.path().join("occupied");
        fs::create_dir_all(target.join("child")).unwrap();

        let err = write_atomic(&target, b"x").unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }
}
