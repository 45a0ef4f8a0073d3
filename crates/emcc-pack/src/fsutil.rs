use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PackError, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn remove_file(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "remove");
    std::fs::remove_file(path).map_err(|e| PackError::fs("remove", path, e))
}

/// Moves a file without touching its bytes.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    tracing::debug!(from = %from.display(), to = %to.display(), "rename");
    if to.exists() {
        std::fs::remove_file(to).map_err(|e| PackError::fs("remove stale", to, e))?;
    }
    std::fs::rename(from, to).map_err(|e| PackError::fs("rename", from, e))
}

pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PackError::fs("read", path, e))
}

/// Writes through a sibling temp file so readers never see a half-written artifact.
pub fn write_atomic_next_to(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path_next_to(path);
    std::fs::write(&tmp, contents).map_err(|e| PackError::fs("write temp", &tmp, e))?;

    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            let _ = std::fs::remove_file(path);
            std::fs::rename(&tmp, path).map_err(|e| {
                let _ = std::fs::remove_file(&tmp);
                PackError::fs("write", path, e)
            })
        }
    }
}

fn temp_path_next_to(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let pid = std::process::id();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file_name}.{pid}.{n}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.js");
        write_atomic_next_to(&path, b"first").unwrap();
        write_atomic_next_to(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.js"]);
    }

    #[test]
    fn rename_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.wasm");
        let to = dir.path().join("a.png");
        std::fs::write(&from, b"\0asm").unwrap();
        std::fs::write(&to, b"stale").unwrap();
        rename(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"\0asm");
    }

    #[test]
    fn removing_a_missing_file_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = remove_file(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Filesystem);
    }
}
