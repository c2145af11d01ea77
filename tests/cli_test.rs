mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use serde_json::Value;

#[test]
fn timings_prints_one_row_per_word() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_reel_command(&env, &["--no-color", "timings", "Chai is  life"])?;
    assert_eq!(output.exit_code, 0, "timings failed: {}", output.stderr);

    let rows: Vec<&str> = output
        .stdout
        .lines()
        .filter(|line| line.trim_start().starts_with(char::is_numeric))
        .collect();
    assert_eq!(rows.len(), 3, "unexpected output:\n{}", output.stdout);
    assert!(rows[0].ends_with("Chai"));
    assert!(rows[2].ends_with("life"));
    assert!(output.stdout.contains("3 words"));
    Ok(())
}

#[test]
fn timings_json_is_machine_readable() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_reel_command(&env, &["--format", "json", "timings", "a extraordinary"])?;
    assert_eq!(output.exit_code, 0, "timings failed: {}", output.stderr);

    let timings: Vec<Value> = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(timings.len(), 2);
    assert_eq!(timings[0]["word"], "a");
    assert_eq!(timings[0]["start"], 0.0);
    assert_eq!(timings[0]["end"], 0.3);
    assert_eq!(timings[1]["index"], 1);
    // 0.3 + 0.05 gap, then 13 characters at 0.05s
    let start = timings[1]["start"].as_f64().unwrap();
    let end = timings[1]["end"].as_f64().unwrap();
    assert!((start - 0.35).abs() < 1e-9);
    assert!((end - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn empty_narration_has_no_timings() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_reel_command(&env, &["--format", "json", "timings", "   "])?;
    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout.trim(), "[]");
    Ok(())
}

#[test]
fn placeholder_writes_a_vertical_jpeg() -> Result<()> {
    let env = TestEnvironment::new()?;
    let target = env.path().join("frames/scene2.jpg");

    let output = utils::run_reel_command(
        &env,
        &[
            "--format",
            "json",
            "placeholder",
            "2",
            "--frame",
            "1",
            "--frames-per-scene",
            "3",
            "--out",
            target.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 0, "placeholder failed: {}", output.stderr);

    let bytes = std::fs::read(&target)?;
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "not a JPEG");

    let event: Value = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(event["code"], "reel.placeholder.written");
    assert_eq!(event["data"]["scene_index"], 2);
    Ok(())
}

#[test]
fn placeholder_rejects_frame_outside_scene() -> Result<()> {
    let env = TestEnvironment::new()?;
    let target = env.path().join("bad.jpg");

    let output = utils::run_reel_command(
        &env,
        &["placeholder", "0", "--frame", "2", "--out", target.to_str().unwrap()],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("--frame"), "stderr: {}", output.stderr);
    assert!(!target.exists());
    Ok(())
}

#[test]
fn generate_rejects_out_of_range_duration() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_reel_command(&env, &["generate", "chai", "--duration", "2"])?;
    assert_eq!(output.exit_code, 1);
    assert!(
        output.stderr.contains("between 5 and 180"),
        "stderr: {}",
        output.stderr
    );
    Ok(())
}

#[test]
fn compose_parses_short_duration_flag() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_reel_command(&env, &["compose", "--help"])?;
    assert_eq!(output.exit_code, 0, "compose --help failed: {}", output.stderr);
    assert!(output.stdout.contains("-t, --duration"));
    Ok(())
}
