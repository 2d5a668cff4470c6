//! Record-replay integration test.
//!
//! A cassette holding the clock, id and oracle traffic of a verification run
//! is replayed against a real task file and store on disk:
//! 1. Build the cassette with `CassetteRecorder`.
//! 2. Verify a task through `ServiceContext::replaying()` and the engine.
//! 3. Assert the task file, the capture index and the verdicts.
//! 4. Replay again into a fresh project and assert determinism.

use std::path::{Path, PathBuf};

use serde_json::json;

use glimpse::capture::CaptureOptions;
use glimpse::cassette::recorder::CassetteRecorder;
use glimpse::config::Config;
use glimpse::context::ServiceContext;
use glimpse::engine::{Engine, EvidenceSource, VerifyOptions};

const TASK: &str = "# Greeting\n\n[cli]: echo ready\n\n- [ ] Prints ready\n- [ ] Exits cleanly\n";

const ANSWER: &str = "Both look fine.\n```json\n{\"summary\": {\"total\": 1, \"passed\": 1, \"failed\": 0, \
    \"uncertain\": 0, \"overall_status\": \"pass\"}, \"items\": [{\"id\": 1, \"status\": \"completed\", \
    \"evidence\": \"stdout shows ready\"}, {\"id\": 2, \"status\": \"uncertain\"}]}\n```";

fn write_cassette(path: &Path) {
    let mut recorder = CassetteRecorder::new(path, "verify-greeting");
    recorder.record("id_gen", "generate_id", json!({}), json!("cap-replay-1"));
    recorder.record("clock", "now", json!({}), json!("2025-03-15T14:30:00Z"));
    recorder.record(
        "oracle",
        "judge",
        json!({"model": "m", "attachments": 0}),
        json!({"Ok": {"text": ANSWER, "prompt_tokens": 812, "completion_tokens": 64}}),
    );
    recorder.record("clock", "now", json!({}), json!("2025-03-15T14:30:05Z"));
    recorder.finish().expect("recording should succeed");
}

fn project(root: &Path) -> (PathBuf, Config) {
    let task = root.join("greeting.md");
    std::fs::write(&task, TASK).unwrap();
    let config = Config {
        store_root: root.join(".glimpse"),
        task_dir: root.to_path_buf(),
        settle_ms: 0,
        wait_before_ms: 0,
        ..Config::default()
    };
    (task, config)
}

fn options(config: &Config) -> VerifyOptions {
    VerifyOptions {
        source: EvidenceSource::Capture { target: None, adapter: None, events: vec![] },
        capture: CaptureOptions::from_config(config),
        detailed: false,
        dry_run: false,
        item: None,
    }
}

async fn replay_once(cassette: &Path, root: &Path) -> (String, Vec<usize>, String) {
    let (task, config) = project(root);
    let ctx = ServiceContext::replaying(cassette, config.clone()).unwrap();
    let engine = Engine::new(&ctx);

    let outcome = engine.verify_task(&task, &options(&config)).await.unwrap();

    let index = engine.store().list().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].id, "cap-replay-1");
    assert_eq!(index[0].captured_at.to_rfc3339(), "2025-03-15T14:30:00+00:00");
    let mark = index[0].verified.as_ref().expect("capture marked verified");
    assert_eq!(mark.verified_at.to_rfc3339(), "2025-03-15T14:30:05+00:00");

    (std::fs::read_to_string(&task).unwrap(), outcome.flipped, mark.summary.clone())
}

#[tokio::test]
async fn replayed_verification_ticks_confirmed_items() {
    let dir = tempfile::tempdir().unwrap();
    let cassette = dir.path().join("greeting.cassette.yaml");
    write_cassette(&cassette);

    let first = tempfile::tempdir().unwrap();
    let (text, flipped, summary) = replay_once(&cassette, first.path()).await;
    assert_eq!(text, TASK.replacen("- [ ] Prints ready", "- [x] Prints ready", 1));
    assert_eq!(flipped, [1]);
    assert_eq!(summary, "1/1 passed, 0 failed, 0 uncertain");

    let captured = std::fs::read_to_string(first.path().join(".glimpse/captures/cap-replay-1.txt"))
        .unwrap();
    assert!(captured.starts_with("$ echo ready\nready\n"));

    // Determinism: a second replay into a fresh project gives the same result.
    let second = tempfile::tempdir().unwrap();
    assert_eq!(replay_once(&cassette, second.path()).await, (text, flipped, summary));
}

#[tokio::test]
async fn exhausted_oracle_leaves_task_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let cassette = dir.path().join("short.cassette.yaml");
    let mut recorder = CassetteRecorder::new(&cassette, "no-oracle");
    recorder.record("id_gen", "generate_id", json!({}), json!("cap-1"));
    recorder.record("clock", "now", json!({}), json!("2025-03-15T14:30:00Z"));
    recorder.finish().unwrap();

    let (task, config) = project(dir.path());
    let ctx = ServiceContext::replaying(&cassette, config.clone()).unwrap();
    let engine = Engine::new(&ctx);

    let err = engine.verify_task(&task, &options(&config)).await.unwrap_err();
    assert!(matches!(err, glimpse::Error::OracleUnavailable(_)), "{err}");
    assert_eq!(std::fs::read_to_string(&task).unwrap(), TASK);
    assert_eq!(engine.store().list_pending().unwrap().len(), 1);
}
