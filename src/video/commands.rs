use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::json;

use super::cli::{ComposeArgs, GenerateArgs, PlaceholderArgs, ReelCommands, TimingsArgs};
use super::config::ReelConfig;
use super::jobs::{
    Collaborators, InMemoryJobStore, Job, JobOrchestrator, JobState, OrchestratorSettings,
    validate_submission,
};
use super::render::{CompositionInputs, CompositionTargets, Compositor};
use super::support::utils::canonicalize_existing;
use super::timing::{estimate, total_span};
use super::visuals::{VisualAsset, write_placeholder};
use crate::common::progress::{create_percent_bar, create_spinner, finish_spinner_with_success};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

pub async fn handle_reel_command(command: ReelCommands) -> Result<()> {
    match command {
        ReelCommands::Generate(args) => handle_generate(args).await,
        ReelCommands::Compose(args) => handle_compose(args).await,
        ReelCommands::Timings(args) => handle_timings(args),
        ReelCommands::Placeholder(args) => handle_placeholder(args).await,
    }
}

async fn handle_generate(args: GenerateArgs) -> Result<()> {
    validate_submission(&args.prompt, args.duration)?;

    let config = ReelConfig::load()?;
    let collaborators = Collaborators::from_config(&config)?;
    let orchestrator = JobOrchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        collaborators,
        config.storage_layout(),
        OrchestratorSettings::from_config(&config),
    );

    let id = orchestrator.submit(&args.prompt, args.duration).await?;

    let bar = match get_output_format() {
        OutputFormat::Text => Some(create_percent_bar("Queued")),
        OutputFormat::Json => None,
    };
    let observe = |job: &Job| {
        if let Some(bar) = &bar {
            bar.set_position(u64::from(job.progress));
            bar.set_message(job.message.clone());
        }
    };

    let job = tokio::select! {
        job = orchestrator.wait(id, observe) => job?,
        _ = tokio::signal::ctrl_c() => {
            if let Some(bar) = &bar {
                bar.abandon_with_message("Interrupted");
            }
            orchestrator.shutdown().await;
            bail!("Interrupted; job {id} was cancelled");
        }
    };
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if job.state != JobState::Completed {
        orchestrator.shutdown().await;
        bail!(
            "Reel generation failed: {}",
            job.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut output = orchestrator.fetch_output(id).await?;
    if let Some(destination) = &args.out {
        output = deliver(&output, destination).await?;
    }
    orchestrator.shutdown().await;

    emit(
        Level::Success,
        "reel.generate.done",
        &format!("✓ Reel ready: {}", output.display()),
        Some(json!({
            "job_id": id,
            "output": output,
            "created_at": job.created_at,
        })),
    );
    Ok(())
}

async fn deliver(output: &Path, destination: &Path) -> Result<PathBuf> {
    ensure_parent_dir(destination).await?;
    tokio::fs::copy(output, destination)
        .await
        .with_context(|| {
            format!(
                "Failed to copy {} to {}",
                output.display(),
                destination.display()
            )
        })?;
    tokio::fs::remove_file(output)
        .await
        .with_context(|| format!("Failed to remove {}", output.display()))?;
    Ok(destination.to_path_buf())
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

async fn handle_compose(args: ComposeArgs) -> Result<()> {
    let config = ReelConfig::load()?;
    let compositor = Compositor::system(config.caption_font.clone(), Some(config.ffmpeg_timeout()))?;

    let audio = canonicalize_existing(&args.audio)?;
    let images = args
        .images
        .iter()
        .map(|image| canonicalize_existing(image))
        .collect::<Result<Vec<_>>>()?;
    let timings = estimate(&args.text);
    let requested_duration = args.duration.unwrap_or(f64::INFINITY);

    // Composition deletes its inputs afterwards, so it works on copies.
    let workdir = tempfile::Builder::new()
        .prefix("reelforge-compose-")
        .tempdir()
        .context("Failed to create working directory")?;
    let targets = CompositionTargets {
        base: workdir.path().join("base.mp4"),
        output: args.out.clone(),
    };

    if args.dry_run {
        let assets = assets_for(images);
        let inputs = CompositionInputs {
            audio: &audio,
            audio_duration: None,
            assets: &assets,
            timings: &timings,
            requested_duration,
        };
        for command in compositor.dry_run(inputs, &targets).await? {
            println!("{command}");
        }
        return Ok(());
    }

    let audio = copy_into(&audio, workdir.path(), "audio").await?;
    let mut copies = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        copies.push(copy_into(image, workdir.path(), &format!("still{index}")).await?);
    }
    let assets = assets_for(copies);
    let inputs = CompositionInputs {
        audio: &audio,
        audio_duration: None,
        assets: &assets,
        timings: &timings,
        requested_duration,
    };

    let spinner = match get_output_format() {
        OutputFormat::Text => Some(create_spinner(format!(
            "Composing {} stills with {} captions...",
            assets.len(),
            timings.len()
        ))),
        OutputFormat::Json => None,
    };
    let result = compositor.compose(inputs, &targets).await;
    match (spinner, &result) {
        (Some(spinner), Ok(output)) => {
            finish_spinner_with_success(spinner, format!("Wrote {}", output.display()))
        }
        (Some(spinner), Err(_)) => spinner.finish_and_clear(),
        (None, _) => {}
    }
    result?;
    Ok(())
}

fn assets_for(paths: Vec<PathBuf>) -> Vec<VisualAsset> {
    paths
        .into_iter()
        .enumerate()
        .map(|(scene_index, path)| VisualAsset {
            path,
            scene_index,
            frame_index: 0,
        })
        .collect()
}

async fn copy_into(source: &Path, dir: &Path, stem: &str) -> Result<PathBuf> {
    let mut target = dir.join(stem);
    if let Some(extension) = source.extension() {
        target.set_extension(extension);
    }
    tokio::fs::copy(source, &target)
        .await
        .with_context(|| format!("Failed to copy {}", source.display()))?;
    Ok(target)
}

fn handle_timings(args: TimingsArgs) -> Result<()> {
    let timings = estimate(&args.text);

    match get_output_format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&timings)?);
        }
        OutputFormat::Text => {
            if timings.is_empty() {
                emit(Level::Warn, "reel.timings.empty", "No words to time", None);
                return Ok(());
            }
            for timing in &timings {
                println!(
                    "{:>4}  {:>7.2}  {:>7.2}  {}",
                    timing.index, timing.start, timing.end, timing.word
                );
            }
            emit(
                Level::Info,
                "reel.timings.total",
                &format!("Total: {} words, {:.2}s", timings.len(), total_span(&timings)),
                None,
            );
        }
    }
    Ok(())
}

async fn handle_placeholder(args: PlaceholderArgs) -> Result<()> {
    if args.frames_per_scene == 0 {
        bail!("--frames-per-scene must be at least 1");
    }
    if args.frame >= args.frames_per_scene {
        bail!(
            "--frame must be below --frames-per-scene ({})",
            args.frames_per_scene
        );
    }

    let PlaceholderArgs {
        scene_index,
        frame,
        frames_per_scene,
        out,
    } = args;
    ensure_parent_dir(&out).await?;

    let path = out.clone();
    tokio::task::spawn_blocking(move || {
        write_placeholder(scene_index, frame, frames_per_scene, &path)
    })
    .await
    .context("Placeholder renderer panicked")??;

    emit(
        Level::Success,
        "reel.placeholder.written",
        &format!("✓ Wrote placeholder to {}", out.display()),
        Some(json!({ "output": out, "scene_index": scene_index })),
    );
    Ok(())
}
