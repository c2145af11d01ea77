//! Reel jobs: submission, the staged pipeline and status queries.

mod orchestrator;
mod store;
mod types;

pub use orchestrator::{Collaborators, JobOrchestrator, OrchestratorSettings};
pub use store::InMemoryJobStore;
pub use types::{DEFAULT_DURATION_SECS, Job, JobState, validate_submission};
