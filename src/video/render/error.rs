use std::fmt;

use thiserror::Error;

/// Pipeline step at which composition stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionStage {
    DurationResolution,
    BaseAssembly,
    CaptionOverlay,
    Mux,
}

impl fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositionStage::DurationResolution => "duration resolution",
            CompositionStage::BaseAssembly => "base assembly",
            CompositionStage::CaptionOverlay => "caption overlay",
            CompositionStage::Mux => "mux",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("no visual assets to compose")]
    NoVisualAssets,
    #[error("could not measure narration duration: {0}")]
    Probe(String),
    #[error("base video assembly failed: {0}")]
    BaseAssembly(String),
    #[error("caption overlay failed: {0}")]
    CaptionOverlay(String),
    #[error("final mux failed: {0}")]
    Mux(String),
}

impl CompositionError {
    pub fn stage(&self) -> CompositionStage {
        match self {
            CompositionError::NoVisualAssets | CompositionError::BaseAssembly(_) => {
                CompositionStage::BaseAssembly
            }
            CompositionError::Probe(_) => CompositionStage::DurationResolution,
            CompositionError::CaptionOverlay(_) => CompositionStage::CaptionOverlay,
            CompositionError::Mux(_) => CompositionStage::Mux,
        }
    }
}
