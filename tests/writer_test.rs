//! Usage log append and keyword patch behavior

mod common;

use chrono::{TimeZone, Utc};
use claude_usage_monitor::{load_usage_entries, CostMode, PatchOutcome, UsageEntry, UsageLog};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn entry(message_id: &str, keyword: Option<&str>) -> UsageEntry {
    UsageEntry {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
        input_tokens: 300,
        output_tokens: 150,
        cache_creation_tokens: 0,
        cache_read_tokens: 0,
        cost_usd: 0.01,
        model: "claude-sonnet-4-5".to_string(),
        message_id: message_id.to_string(),
        request_id: format!("req_{}", message_id),
        keyword: keyword.map(str::to_string),
        text: Some("never written".to_string()),
    }
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_append_writes_canonical_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("usage.jsonl");
    let log = UsageLog::at(&path);

    assert!(log.append(&entry("m1", None)));
    assert!(log.append(&entry("m2", Some("urgent"))));

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);

    let first = lines[0].as_object().unwrap();
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "timestamp",
            "model",
            "input_tokens",
            "output_tokens",
            "cache_creation_tokens",
            "cache_read_tokens",
            "cost_usd",
            "message_id",
            "request_id"
        ]
    );
    assert!(!first.contains_key("text"));
    assert_eq!(lines[1]["keyword"], "urgent");
}

#[test]
fn test_append_prefers_candidate_with_existing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing").join("usage.jsonl");
    let present_dir = temp_dir.path().join("present");
    fs::create_dir_all(&present_dir).unwrap();
    let present = present_dir.join("usage.jsonl");

    let log = UsageLog::with_candidates(vec![missing.clone(), present.clone()]);
    assert_eq!(log.append_path(), Some(present.clone()));
    assert!(log.append(&entry("m1", None)));
    assert!(present.is_file());
    assert!(!missing.exists());

    // With no directory present, the first candidate is created.
    let fresh = temp_dir.path().join("fresh").join("usage.jsonl");
    let other = temp_dir.path().join("other").join("usage.jsonl");
    let log = UsageLog::with_candidates(vec![fresh.clone(), other]);
    assert!(log.append(&entry("m1", None)));
    assert!(fresh.is_file());
}

#[test]
fn test_patch_then_reload_shows_new_keyword() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("usage.jsonl");
    let log = UsageLog::at(&path);
    log.append(&entry("m1", None));
    log.append(&entry("m2", Some("keep")));

    assert_eq!(log.add_keyword("m1", "urgent"), PatchOutcome::Updated);

    let (entries, _) = load_usage_entries(Some(temp_dir.path()), None, CostMode::Auto, false);
    assert_eq!(entries.len(), 2);
    let by_id = |id: &str| entries.iter().find(|e| e.message_id == id).unwrap();
    assert_eq!(by_id("m1").keyword.as_deref(), Some("urgent"));
    assert_eq!(by_id("m2").keyword.as_deref(), Some("keep"));
}

#[test]
fn test_patch_missing_message_leaves_file_identical() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("usage.jsonl");
    let log = UsageLog::at(&path);
    log.append(&entry("m1", None));
    let before = fs::read(&path).unwrap();

    let outcome = log.add_keyword("missing", "urgent");
    assert_eq!(outcome, PatchOutcome::NotFound);
    assert!(!outcome.is_success());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_patch_without_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let log = UsageLog::at(temp_dir.path().join("absent.jsonl"));
    assert_eq!(log.add_keyword("m1", "urgent"), PatchOutcome::NoLogFile);
}
