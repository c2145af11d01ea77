use std::path::{Path, PathBuf};

/// Ordered `-i` inputs; an input's position is its ffmpeg stream index.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    sources: Vec<PathBuf>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: &Path) -> usize {
        self.sources.push(source.to_path_buf());
        self.sources.len() - 1
    }

    pub fn input_args(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|source| ["-i".to_string(), source.to_string_lossy().into_owned()])
            .collect()
    }
}
