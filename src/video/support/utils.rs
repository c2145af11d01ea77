use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ui::prelude::{Level, emit};

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

/// Delete every file that exists, logging failures instead of returning them.
///
/// Returns the number of files that could not be removed.
pub async fn remove_files_best_effort(files: &[PathBuf]) -> usize {
    let mut failures = 0;
    for file in files {
        match tokio::fs::remove_file(file).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                failures += 1;
                emit(
                    Level::Warn,
                    "reel.cleanup.failed",
                    &format!("Cleanup error for {}: {}", file.display(), err),
                    None,
                );
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_existing_and_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.jpg");
        std::fs::write(&present, b"x").unwrap();
        let missing = dir.path().join("gone.jpg");

        let failures = remove_files_best_effort(&[present.clone(), missing]).await;
        assert_eq!(failures, 0);
        assert!(!present.exists());
    }

    #[tokio::test]
    async fn directory_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        assert_eq!(remove_files_best_effort(&[sub]).await, 1);
    }

    #[test]
    fn canonicalize_rejects_missing_path() {
        assert!(canonicalize_existing(Path::new("/definitely/not/here.mp3")).is_err());
    }
}
