mod common;

use common::{Event, Journal, MockCapture, MockDriver};
use flow_engine::{BatchConfig, BatchDriver, FlowEngineError, ReplayConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const FLOW: &str = r##"{
  "title": "sample",
  "steps": [
    {"type": "setViewport", "width": 1280, "height": 720, "deviceScaleFactor": 1, "isMobile": false, "hasTouch": false, "isLandscape": false},
    {"type": "navigate", "url": "https://example.com/", "assertedEvents": [{"type": "navigation", "url": "https://example.com/", "title": ""}]},
    {"type": "click", "selectors": [["aria/More information"], ["#more"]], "offsetX": 10, "offsetY": 4}
  ]
}"##;

fn no_delay() -> ReplayConfig {
    ReplayConfig {
        step_delay: std::time::Duration::ZERO,
        ..Default::default()
    }
}

fn capture_outputs(journal: &Journal) -> Vec<PathBuf> {
    journal
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::CaptureStart(path) => Some(path),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_directory_produces_one_video_per_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("flows");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("a.json"), FLOW).unwrap();
    fs::write(input.join("b.json"), FLOW).unwrap();
    fs::write(input.join("notes.txt"), "not a flow").unwrap();
    let out = dir.path().join("videos");

    let journal = Journal::new();
    let driver = MockDriver::new(journal.clone());
    let capture = MockCapture::new(journal.clone());
    let replay = no_delay();
    let batch = BatchConfig::new(&input, &out);

    let report = assert_ok!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);

    assert!(out.is_dir());
    assert_eq!(report.video_count(), 2);
    let mut outputs = capture_outputs(&journal);
    outputs.sort();
    assert_eq!(outputs, vec![out.join("a.mp4"), out.join("b.mp4")]);
    // one browser per flow
    assert_eq!(journal.count(|e| matches!(e, Event::Launch { .. })), 2);
    assert_eq!(journal.count(|e| *e == Event::Close), 2);
}

#[tokio::test]
async fn test_single_file_lands_in_output_dir() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("demo.json");
    fs::write(&source, FLOW).unwrap();
    let out = dir.path().join("out");

    let journal = Journal::new();
    let driver = MockDriver::new(journal.clone());
    let capture = MockCapture::new(journal.clone());
    let replay = no_delay();
    let batch = BatchConfig::new(&source, &out);

    let report = assert_ok!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);

    let outputs: Vec<&Path> = report.outputs().collect();
    assert_eq!(outputs, vec![out.join("demo.mp4").as_path()]);
    assert_eq!(report.replays[0].title, "sample");
    assert_eq!(report.replays[0].source.as_deref(), Some(source.as_path()));
}

#[tokio::test]
async fn test_ignore_navigation_applies_to_every_flow() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("demo.json");
    fs::write(&source, FLOW).unwrap();

    let journal = Journal::new();
    let driver = MockDriver::new(journal.clone());
    let capture = MockCapture::new(journal.clone());
    let replay = ReplayConfig {
        ignore_navigation: true,
        ..no_delay()
    };
    let batch = BatchConfig::new(&source, dir.path().join("out"));

    let report = assert_ok!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);
    assert_eq!(report.replays[0].steps_executed, 2);
    assert_eq!(
        journal.count(|e| *e == Event::Step(flow_engine::StepKind::Navigate)),
        0
    );
}

#[tokio::test]
async fn test_malformed_flow_aborts_before_any_browser() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.json"), FLOW).unwrap();
    fs::write(dir.path().join("bad.json"), "{\"steps\": [").unwrap();

    let journal = Journal::new();
    let driver = MockDriver::new(journal.clone());
    let capture = MockCapture::new(journal.clone());
    let replay = no_delay();
    let batch = BatchConfig::new(dir.path(), dir.path().join("out"));

    let err = assert_err!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);
    assert!(matches!(err, FlowEngineError::FlowParse { .. }));
    assert!(journal.events().is_empty());
}

#[tokio::test]
async fn test_first_failure_aborts_batch() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one.json"), FLOW).unwrap();
    fs::write(dir.path().join("two.json"), FLOW).unwrap();

    let journal = Journal::new();
    let mut driver = MockDriver::new(journal.clone());
    driver.fail_on_call = Some(3);
    let capture = MockCapture::new(journal.clone());
    let replay = no_delay();
    let batch = BatchConfig::new(dir.path(), dir.path().join("out"));

    let err = assert_err!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);
    assert!(matches!(err, FlowEngineError::StepFailed { index: 3, .. }));
    assert_eq!(journal.count(|e| matches!(e, Event::Launch { .. })), 1);
    assert_eq!(journal.count(|e| *e == Event::CaptureStop), 1);
}

#[tokio::test]
async fn test_missing_input_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let journal = Journal::new();
    let driver = MockDriver::new(journal.clone());
    let capture = MockCapture::new(journal.clone());
    let replay = no_delay();
    let batch = BatchConfig::new(dir.path().join("missing"), dir.path().join("out"));

    let err = assert_err!(BatchDriver::new(&driver, &capture, &replay, &batch).run().await);
    assert_eq!(err.class(), flow_engine::ErrorClass::Configuration);
    assert!(!dir.path().join("out").exists());
}
