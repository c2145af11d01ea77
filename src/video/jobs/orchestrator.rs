use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::store::JobStore;
use super::types::{
    Job, JobId, JobQueryError, JobStage, JobState, JobUpdate, SubmitError, validate_submission,
};
use crate::ui::prelude::{Level, emit};
use crate::video::config::{ReelConfig, StorageLayout};
use crate::video::narration::{NarrationSynthesizer, SynthesisError, TranslateTts};
use crate::video::render::ffmpeg::services::FfprobeProber;
use crate::video::render::{CompositionError, CompositionInputs, CompositionTargets, Compositor};
use crate::video::script::{ChatScriptSettings, ChatScriptWriter, ScriptWriter};
use crate::video::support::utils::remove_files_best_effort;
use crate::video::timing::estimate;
use crate::video::visuals::{PollinationsGenerator, VisualProducer};

/// External services a job pipeline calls into.
pub struct Collaborators {
    pub script_writer: Arc<dyn ScriptWriter>,
    pub narrator: Arc<dyn NarrationSynthesizer>,
    pub visuals: Arc<VisualProducer>,
    pub compositor: Arc<Compositor>,
}

impl Collaborators {
    /// HTTP backends and the system ffmpeg, configured from `config`.
    pub fn from_config(config: &ReelConfig) -> Result<Self> {
        let prober = Arc::new(FfprobeProber::new(Some(config.ffmpeg_timeout())));
        let script_writer = ChatScriptWriter::new(ChatScriptSettings {
            endpoint: config.script_endpoint.clone(),
            model: config.script_model.clone(),
            api_key: config.script_api_key.clone(),
            timeout: config.script_timeout(),
        })?;
        let narrator = TranslateTts::new(config.tts_timeout(), prober)
            .context("Failed to create speech client")?;
        let generator = PollinationsGenerator::new(config.image_timeout())
            .context("Failed to create image client")?;
        let compositor =
            Compositor::system(config.caption_font.clone(), Some(config.ffmpeg_timeout()))?;

        Ok(Self {
            script_writer: Arc::new(script_writer),
            narrator: Arc::new(narrator),
            visuals: Arc::new(VisualProducer::new(
                Arc::new(generator),
                config.producer_settings(),
            )),
            compositor: Arc::new(compositor),
        })
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub language: String,
    pub max_concurrent_compositions: usize,
    /// How often [`JobOrchestrator::wait`] re-reads job state
    pub poll_interval: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &ReelConfig) -> Self {
        Self {
            language: config.language.clone(),
            max_concurrent_compositions: config.max_concurrent_compositions,
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Error)]
enum PipelineError {
    #[error("cancelled")]
    Cancelled,
    #[error("script generation failed: {0:#}")]
    Script(anyhow::Error),
    #[error(transparent)]
    Narration(#[from] SynthesisError),
    #[error("{stage}: {0}", stage = .0.stage())]
    Composition(#[from] CompositionError),
    #[error("{0:#}")]
    Storage(anyhow::Error),
}

/// Drives reel jobs from prompt to finished video.
///
/// Each submitted job runs on its own task. Job snapshots are readable at
/// any time through [`status`](Self::status) while the pipeline advances.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn JobStore>,
    collaborators: Collaborators,
    layout: StorageLayout,
    settings: OrchestratorSettings,
    composition_slots: Semaphore,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        collaborators: Collaborators,
        layout: StorageLayout,
        settings: OrchestratorSettings,
    ) -> Self {
        let slots = settings.max_concurrent_compositions.max(1);
        Self {
            inner: Arc::new(Inner {
                store,
                collaborators,
                layout,
                composition_slots: Semaphore::new(slots),
                settings,
                shutdown: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Queue a job and start its pipeline in the background.
    pub async fn submit(&self, prompt: &str, duration_secs: f64) -> Result<JobId, SubmitError> {
        validate_submission(prompt, duration_secs)?;

        let job = Job::new(prompt.trim(), duration_secs);
        let id = job.id;
        self.inner.store.insert(job).await;

        emit(
            Level::Info,
            "reel.job.submitted",
            &format!("Job {id} queued ({duration_secs}s)"),
            Some(json!({ "job_id": id, "prompt": prompt.trim(), "duration": duration_secs })),
        );

        let inner = Arc::clone(&self.inner);
        let token = self.inner.shutdown.child_token();
        let prompt = prompt.trim().to_string();
        let handle = tokio::spawn(async move {
            inner.run_job(id, prompt, duration_secs, token).await;
        });

        if let Ok(mut tasks) = self.inner.tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle);
        }

        Ok(id)
    }

    pub async fn status(&self, id: JobId) -> Result<Job, JobQueryError> {
        self.inner
            .store
            .get(id)
            .await
            .ok_or(JobQueryError::NotFound(id))
    }

    /// Path of the finished video of a completed job.
    pub async fn fetch_output(&self, id: JobId) -> Result<PathBuf, JobQueryError> {
        let job = self.status(id).await?;
        let Some(output) = job.output.filter(|_| job.state == JobState::Completed) else {
            return Err(JobQueryError::NotReady(id));
        };
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(JobQueryError::NotFound(id));
        }
        Ok(output)
    }

    /// Poll until the job is completed or failed, reporting each snapshot.
    pub async fn wait(
        &self,
        id: JobId,
        mut observe: impl FnMut(&Job),
    ) -> Result<Job, JobQueryError> {
        loop {
            let job = self.status(id).await?;
            observe(&job);
            if job.state.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(self.inner.settings.poll_interval).await;
        }
    }

    /// Cancel every running job and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let tasks = match self.inner.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        for task in tasks {
            if let Err(err) = task.await {
                emit(
                    Level::Error,
                    "reel.job.panicked",
                    &format!("Job task ended abnormally: {err}"),
                    None,
                );
            }
        }
    }
}

impl Inner {
    async fn run_job(&self, id: JobId, prompt: String, duration: f64, token: CancellationToken) {
        match self.run_pipeline(id, &prompt, duration, &token).await {
            Ok(output) => {
                self.store.update(id, JobUpdate::Complete(output.clone())).await;
                emit(
                    Level::Success,
                    "reel.job.completed",
                    &format!("Job {id} finished: {}", output.display()),
                    Some(json!({ "job_id": id, "output": output })),
                );
            }
            Err(err) => {
                let message = err.to_string();
                self.discard_intermediates(&id.to_string()).await;
                self.store.update(id, JobUpdate::Fail(message.clone())).await;
                emit(
                    Level::Error,
                    "reel.job.failed",
                    &format!("Job {id} failed: {message}"),
                    Some(json!({ "job_id": id, "error": message })),
                );
            }
        }
    }

    async fn run_pipeline(
        &self,
        id: JobId,
        prompt: &str,
        duration: f64,
        token: &CancellationToken,
    ) -> Result<PathBuf, PipelineError> {
        let key = id.to_string();
        self.layout
            .ensure_directories()
            .map_err(PipelineError::Storage)?;

        self.advance(id, JobStage::Script).await;
        let script = cancellable(token, self.collaborators.script_writer.write(prompt, duration))
            .await?
            .map_err(PipelineError::Script)?;
        let timings = estimate(&script.full_text);

        let audio_path = self.layout.audio_path(&key);
        let destination = self.layout.asset_destination(&key);
        let narration = async {
            self.advance(id, JobStage::Narration).await;
            self.collaborators
                .narrator
                .synthesize(&script.full_text, &self.settings.language, &audio_path)
                .await
        };
        let visuals = async {
            self.advance(id, JobStage::Visuals).await;
            self.collaborators
                .visuals
                .produce_all(&script.scenes, &destination)
                .await
        };
        let (audio, assets) = cancellable(token, async { tokio::join!(narration, visuals) }).await?;
        let audio = audio?;

        if assets.is_empty() {
            return Err(CompositionError::NoVisualAssets.into());
        }

        let _slot = cancellable(token, self.composition_slots.acquire())
            .await?
            .map_err(|_| PipelineError::Cancelled)?;
        self.advance(id, JobStage::Composition).await;

        let targets = CompositionTargets {
            base: self.layout.base_video_path(&key),
            output: self.layout.output_path(&key),
        };
        let inputs = CompositionInputs {
            audio: &audio.path,
            audio_duration: Some(audio.duration),
            assets: &assets,
            timings: &timings,
            requested_duration: duration,
        };
        let output = cancellable(token, self.collaborators.compositor.compose(inputs, &targets))
            .await??;

        Ok(output)
    }

    /// Best-effort removal of everything a failed job left behind.
    async fn discard_intermediates(&self, key: &str) {
        let mut files = match self.layout.intermediates(key) {
            Ok(files) => files,
            Err(err) => {
                emit(
                    Level::Warn,
                    "reel.cleanup.failed",
                    &format!("Could not scan intermediates of job {key}: {err:#}"),
                    None,
                );
                Vec::new()
            }
        };
        files.push(self.layout.output_path(key));
        remove_files_best_effort(&files).await;
    }

    async fn advance(&self, id: JobId, stage: JobStage) {
        if self.store.update(id, JobUpdate::Advance(stage)).await == Some(true) {
            emit(
                Level::Debug,
                "reel.job.stage",
                &format!("Job {id}: {}", stage.message()),
                Some(json!({ "job_id": id, "stage": stage, "progress": stage.progress() })),
            );
        }
    }
}

async fn cancellable<F: Future>(
    token: &CancellationToken,
    work: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        output = work => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::fakes::{
        FailingImages, FakeNarrator, FixedProber, ScriptedRunner, StaticScriptWriter,
    };
    use crate::video::jobs::store::InMemoryJobStore;
    use crate::video::render::ffmpeg::compiler::CaptionStyle;
    use crate::video::visuals::ProducerSettings;

    struct Harness {
        _dir: tempfile::TempDir,
        orchestrator: JobOrchestrator,
        runner: Arc<ScriptedRunner>,
        layout: StorageLayout,
    }

    fn harness(scenes: usize, narrator: FakeNarrator) -> Harness {
        build_harness(scenes, narrator, ScriptedRunner::default(), FixedProber::new(25.0))
    }

    fn harness_with_runner(scenes: usize, narrator: FakeNarrator, runner: ScriptedRunner) -> Harness {
        build_harness(scenes, narrator, runner, FixedProber::new(25.0))
    }

    fn harness_with_prober(scenes: usize, narrator: FakeNarrator, prober: FixedProber) -> Harness {
        build_harness(scenes, narrator, ScriptedRunner::default(), prober)
    }

    fn build_harness(
        scenes: usize,
        narrator: FakeNarrator,
        runner: ScriptedRunner,
        prober: FixedProber,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("output"), dir.path().join("temp"));
        let runner = Arc::new(runner);
        let collaborators = Collaborators {
            script_writer: Arc::new(StaticScriptWriter::with_scenes(scenes)),
            narrator: Arc::new(narrator),
            visuals: Arc::new(VisualProducer::new(
                Arc::new(FailingImages),
                ProducerSettings {
                    frames_per_scene: 1,
                    concurrency: 1,
                    delay: Duration::ZERO,
                    width: 36,
                    height: 64,
                },
            )),
            compositor: Arc::new(Compositor::new(
                runner.clone(),
                Arc::new(prober),
                CaptionStyle::default(),
                None,
            )),
        };
        let orchestrator = JobOrchestrator::new(
            Arc::new(InMemoryJobStore::new()),
            collaborators,
            layout.clone(),
            OrchestratorSettings {
                language: "hinglish".to_string(),
                max_concurrent_compositions: 2,
                poll_interval: Duration::from_millis(5),
            },
        );
        Harness {
            _dir: dir,
            orchestrator,
            runner,
            layout,
        }
    }

    #[tokio::test]
    async fn job_completes_with_retrievable_output() {
        let h = harness(4, FakeNarrator::ok());
        let id = h.orchestrator.submit("chai ki kahani", 40.0).await.unwrap();

        let mut seen = Vec::new();
        let job = h
            .orchestrator
            .wait(id, |job| seen.push(job.progress))
            .await
            .unwrap();

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));

        let output = h.orchestrator.fetch_output(id).await.unwrap();
        assert_eq!(output, h.layout.output_path(&id.to_string()));
        assert!(output.exists());

        let base_args = &h.runner.calls()[0];
        let graph_idx = base_args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(base_args[graph_idx + 1].contains("concat=n=4:v=1:a=0"));

        let again = h.orchestrator.status(id).await.unwrap();
        assert_eq!(again.state, JobState::Completed);
    }

    #[tokio::test]
    async fn zero_scenes_fail_without_passing_visuals() {
        let h = harness(0, FakeNarrator::ok());
        let id = h.orchestrator.submit("empty", 30.0).await.unwrap();

        let job = h.orchestrator.wait(id, |_| {}).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert!(job.progress <= 40);
        assert!(job.output.is_none());
        assert!(job.error.unwrap().contains("no visual assets"));
        assert!(h.runner.calls().is_empty());
        assert_eq!(
            h.orchestrator.fetch_output(id).await,
            Err(JobQueryError::NotReady(id))
        );
    }

    #[tokio::test]
    async fn narration_failure_is_fatal() {
        let h = harness(2, FakeNarrator::failing());
        let id = h.orchestrator.submit("voice", 30.0).await.unwrap();

        let job = h.orchestrator.wait(id, |_| {}).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.unwrap().contains("narration synthesis failed"));
        assert!(job.progress <= 40);
    }

    #[tokio::test]
    async fn running_job_is_not_ready() {
        let narrator = FakeNarrator::gated();
        let gate = narrator.gate();
        let h = harness(1, narrator);
        let id = h.orchestrator.submit("slow", 30.0).await.unwrap();

        assert_eq!(
            h.orchestrator.fetch_output(id).await,
            Err(JobQueryError::NotReady(id))
        );
        gate.notify_one();

        let job = h.orchestrator.wait(id, |_| {}).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let h = harness(1, FakeNarrator::ok());
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            h.orchestrator.status(id).await.unwrap_err(),
            JobQueryError::NotFound(id)
        );
        assert_eq!(
            h.orchestrator.fetch_output(id).await,
            Err(JobQueryError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn missing_output_file_is_not_found() {
        let h = harness(1, FakeNarrator::ok());
        let id = h.orchestrator.submit("gone", 30.0).await.unwrap();
        h.orchestrator.wait(id, |_| {}).await.unwrap();

        std::fs::remove_file(h.layout.output_path(&id.to_string())).unwrap();

        assert_eq!(
            h.orchestrator.fetch_output(id).await,
            Err(JobQueryError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn invalid_submissions_are_rejected() {
        let h = harness(1, FakeNarrator::ok());
        assert_eq!(
            h.orchestrator.submit("   ", 30.0).await,
            Err(SubmitError::EmptyPrompt)
        );
        assert!(h.orchestrator.submit("x", 500.0).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_cancels_running_jobs() {
        let narrator = FakeNarrator::gated();
        let h = harness(1, narrator);
        let id = h.orchestrator.submit("forever", 30.0).await.unwrap();

        h.orchestrator.shutdown().await;

        let job = h.orchestrator.status(id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn composition_failure_names_the_stage() {
        let runner = ScriptedRunner::failing_when(|args| args.iter().any(|a| a == "-filter_complex"));
        let h = harness_with_runner(2, FakeNarrator::ok(), runner);
        let id = h.orchestrator.submit("broken", 30.0).await.unwrap();

        let job = h.orchestrator.wait(id, |_| {}).await.unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.progress, 70);
        let error = job.error.unwrap();
        assert!(error.starts_with("base assembly: "), "{error}");
    }

    #[tokio::test]
    async fn failed_job_leaves_no_intermediates() {
        let h = harness(3, FakeNarrator::failing());
        let id = h.orchestrator.submit("voice", 30.0).await.unwrap();

        h.orchestrator.wait(id, |_| {}).await.unwrap();

        let key = id.to_string();
        let leftovers: Vec<_> = std::fs::read_dir(h._dir.path().join("temp"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&key))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn narrator_duration_is_passed_to_composition() {
        let h = harness_with_prober(1, FakeNarrator::ok(), FixedProber::failing());
        let id = h.orchestrator.submit("measured", 30.0).await.unwrap();

        let job = h.orchestrator.wait(id, |_| {}).await.unwrap();

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(h.runner.durations()[0], Some(25.0));
    }
}
