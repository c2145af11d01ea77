use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type JobId = Uuid;

pub const MIN_DURATION_SECS: f64 = 5.0;
pub const MAX_DURATION_SECS: f64 = 180.0;
pub const DEFAULT_DURATION_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Script,
    Narration,
    Visuals,
    Composition,
}

impl JobStage {
    pub fn progress(self) -> u8 {
        match self {
            JobStage::Script => 10,
            JobStage::Narration => 25,
            JobStage::Visuals => 40,
            JobStage::Composition => 70,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            JobStage::Script => "Creating script...",
            JobStage::Narration => "Generating voiceover...",
            JobStage::Visuals => "Creating animated frames...",
            JobStage::Composition => "Adding animations and captions...",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Script => "script",
            JobStage::Narration => "narration",
            JobStage::Visuals => "visuals",
            JobStage::Composition => "composition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running(JobStage),
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Position in the lifecycle; transitions must strictly increase it.
    fn rank(self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Running(stage) => 1 + stage as u8,
            JobState::Completed | JobState::Failed => u8::MAX,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => f.write_str("queued"),
            JobState::Running(stage) => write!(f, "running ({stage})"),
            JobState::Completed => f.write_str("completed"),
            JobState::Failed => f.write_str("failed"),
        }
    }
}

/// Snapshot of one reel job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub requested_duration: f64,
    pub state: JobState,
    /// 0-100
    pub progress: u8,
    pub message: String,
    /// Present only once completed
    pub output: Option<PathBuf>,
    /// Present only once failed
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A forward step applied to a stored job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Advance(JobStage),
    Complete(PathBuf),
    Fail(String),
}

impl Job {
    pub fn new(prompt: impl Into<String>, requested_duration: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            requested_duration,
            state: JobState::Queued,
            progress: 0,
            message: "Queued".to_string(),
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `update` if it moves the job forward. Returns whether it did.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        let next = match &update {
            JobUpdate::Advance(stage) => JobState::Running(*stage),
            JobUpdate::Complete(_) => JobState::Completed,
            JobUpdate::Fail(_) => JobState::Failed,
        };
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return false;
        }

        match update {
            JobUpdate::Advance(stage) => {
                self.progress = stage.progress();
                self.message = stage.message().to_string();
            }
            JobUpdate::Complete(output) => {
                self.progress = 100;
                self.message = "Video ready!".to_string();
                self.output = Some(output);
            }
            JobUpdate::Fail(error) => {
                self.message = format!("Failed: {error}");
                self.error = Some(error);
            }
        }
        self.state = next;
        self.updated_at = Utc::now();
        true
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum JobQueryError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {0} is not completed yet")]
    NotReady(JobId),
}

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("duration must be between {min} and {max} seconds, got {got}")]
    DurationOutOfRange { got: f64, min: f64, max: f64 },
}

pub fn validate_submission(prompt: &str, duration: f64) -> Result<(), SubmitError> {
    if prompt.trim().is_empty() {
        return Err(SubmitError::EmptyPrompt);
    }
    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
        return Err(SubmitError::DurationOutOfRange {
            got: duration,
            min: MIN_DURATION_SECS,
            max: MAX_DURATION_SECS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_publish_fixed_progress() {
        let mut job = Job::new("chai", 30.0);
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.progress, 0);

        for (stage, expected) in [
            (JobStage::Script, 10),
            (JobStage::Narration, 25),
            (JobStage::Visuals, 40),
            (JobStage::Composition, 70),
        ] {
            assert!(job.apply(JobUpdate::Advance(stage)));
            assert_eq!(job.progress, expected);
        }

        assert!(job.apply(JobUpdate::Complete("out.mp4".into())));
        assert_eq!(job.progress, 100);
        assert_eq!(job.output, Some(PathBuf::from("out.mp4")));
        assert!(job.error.is_none());
    }

    #[test]
    fn transitions_never_go_backwards() {
        let mut job = Job::new("chai", 30.0);
        job.apply(JobUpdate::Advance(JobStage::Visuals));
        assert!(!job.apply(JobUpdate::Advance(JobStage::Narration)));
        assert!(!job.apply(JobUpdate::Advance(JobStage::Visuals)));
        assert_eq!(job.progress, 40);
    }

    #[test]
    fn failure_keeps_progress_and_has_no_output() {
        let mut job = Job::new("chai", 30.0);
        job.apply(JobUpdate::Advance(JobStage::Narration));
        assert!(job.apply(JobUpdate::Fail("voice down".into())));

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.progress, 25);
        assert!(job.output.is_none());
        assert_eq!(job.error.as_deref(), Some("voice down"));
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = Job::new("chai", 30.0);
        job.apply(JobUpdate::Complete("a.mp4".into()));
        assert!(!job.apply(JobUpdate::Fail("late".into())));
        assert!(!job.apply(JobUpdate::Advance(JobStage::Script)));
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn state_serializes_with_stage() {
        let json = serde_json::to_value(JobState::Running(JobStage::Visuals)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "running", "stage": "visuals"}));
        assert_eq!(JobState::Running(JobStage::Visuals).to_string(), "running (visuals)");
    }

    #[test]
    fn submissions_are_validated() {
        assert_eq!(validate_submission("  ", 30.0), Err(SubmitError::EmptyPrompt));
        assert!(matches!(
            validate_submission("x", 4.0),
            Err(SubmitError::DurationOutOfRange { .. })
        ));
        assert!(validate_submission("x", 181.0).is_err());
        assert!(validate_submission("x", f64::NAN).is_err());
        assert!(validate_submission("x", 5.0).is_ok());
        assert!(validate_submission("x", 180.0).is_ok());
    }
}
