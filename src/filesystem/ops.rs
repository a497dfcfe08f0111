// src/filesystem/ops.rs

//! Whole-file copy, move and recursive removal
//!
//! Copies read the source fully into memory. That is fine for keys and the
//! small installer packages handled here, but these helpers are not meant
//! for large files.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Recursively remove `path`
///
/// Directories are emptied depth-first and then removed. If any child fails
/// to be removed the walk stops and the parent is left in place. If the type
/// of `path` cannot be determined, a plain unlink is still attempted and its
/// result decides the outcome.
pub fn remove_recursive(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Cannot stat {}: {}, attempting plain removal", path.display(), e);
            return fs::remove_file(path).map_err(|e| {
                Error::Io(format!("Failed to remove {}: {}", path.display(), e))
            });
        }
    };

    if !metadata.is_dir() {
        return fs::remove_file(path)
            .map_err(|e| Error::Io(format!("Failed to remove {}: {}", path.display(), e)));
    }

    let entries = fs::read_dir(path)
        .map_err(|e| Error::Io(format!("Failed to read directory {}: {}", path.display(), e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::Io(format!("Failed to read directory {}: {}", path.display(), e))
        })?;
        let child = entry.path();
        if let Err(e) = remove_recursive(&child) {
            warn!(
                "Failed to remove {} from {}",
                entry.file_name().to_string_lossy(),
                path.display()
            );
            return Err(e);
        }
    }

    fs::remove_dir(path)
        .map_err(|e| Error::Io(format!("Failed to remove directory {}: {}", path.display(), e)))
}

/// Copy the full content of `src` to `dst`, overwriting `dst`
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let content = fs::read(src)
        .map_err(|e| Error::Io(format!("Failed to read {}: {}", src.display(), e)))?;

    let mut file = File::create(dst)
        .map_err(|e| Error::Io(format!("Failed to open {} for writing: {}", dst.display(), e)))?;

    file.write_all(&content)
        .and_then(|_| file.flush())
        .map_err(|e| Error::Io(format!("Failed to write {}: {}", dst.display(), e)))?;

    // Catch short writes that did not surface as an error
    let written = file
        .metadata()
        .map_err(|e| Error::Io(format!("Failed to stat {}: {}", dst.display(), e)))?
        .len();
    if written != content.len() as u64 {
        return Err(Error::Io(format!(
            "Failed to write {} ({}/{} bytes)",
            dst.display(),
            written,
            content.len()
        )));
    }

    debug!("Copied {} to {} ({} bytes)", src.display(), dst.display(), written);
    Ok(())
}

/// Copy `src` to `dst`, then delete `src`
///
/// If the copy fails nothing is deleted. If the delete fails the call still
/// reports failure even though `dst` already holds the content.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    copy_file(src, dst)?;

    fs::remove_file(src).map_err(|e| {
        Error::Io(format!(
            "Copied {} to {} but failed to remove source: {}",
            src.display(),
            dst.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::write(&src, b"new content").unwrap();
        fs::write(&dst, b"old content that is longer").unwrap();

        copy_file(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"new content");
        assert!(src.exists());
    }

    #[test]
    fn test_copy_file_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = copy_file(&temp.path().join("missing"), &temp.path().join("dst"));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!temp.path().join("dst").exists());
    }

    #[test]
    fn test_copy_file_unwritable_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::write(&src, b"data").unwrap();

        let result = copy_file(&src, &temp.path().join("no/such/dir/dst"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_move_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("package.rpm");
        let dst = temp.path().join("p.rpm");
        fs::write(&src, b"rpm bytes").unwrap();

        move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"rpm bytes");
    }

    #[test]
    fn test_move_file_failed_copy_keeps_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("package.rpm");
        fs::write(&src, b"rpm bytes").unwrap();

        let result = move_file(&src, &temp.path().join("missing/p.rpm"));
        assert!(result.is_err());
        assert_eq!(fs::read(&src).unwrap(), b"rpm bytes");
    }

    #[test]
    fn test_remove_recursive_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("workspace");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/file"), b"1").unwrap();
        fs::write(root.join("a/b/c/file"), b"2").unwrap();

        remove_recursive(&root).unwrap();

        assert!(!root.exists());
    }

    #[test]
    fn test_remove_recursive_plain_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("key.pub");
        fs::write(&file, b"ssh-rsa AAAA").unwrap();

        remove_recursive(&file).unwrap();

        assert!(!file.exists());
    }

    #[test]
    fn test_remove_recursive_missing_path() {
        let temp = TempDir::new().unwrap();
        let result = remove_recursive(&temp.path().join("never-existed"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_remove_recursive_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("keep"), b"keep").unwrap();

        let root = temp.path().join("workspace");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        remove_recursive(&root).unwrap();

        assert!(!root.exists());
        assert!(outside.join("keep").exists());
    }
}
