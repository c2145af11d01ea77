use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directories for one CLI test, isolated from the real home.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("reelforge-test-").tempdir()?;
        std::fs::create_dir_all(temp_dir.path().join("home"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Stand-in for `$HOME` and the XDG directories
    pub fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }
}
