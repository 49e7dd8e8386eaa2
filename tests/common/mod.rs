#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub fn create_test_jsonl(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn write_records(dir: &Path, filename: &str, records: &[Value]) -> Result<PathBuf> {
    let content: Vec<String> = records.iter().map(Value::to_string).collect();
    create_test_jsonl(dir, filename, &(content.join("\n") + "\n"))
}

pub fn iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn hours_ago(hours: i64) -> String {
    iso(Utc::now() - Duration::hours(hours))
}

/// An assistant line in the Claude Code project log shape.
pub fn assistant_record(message_id: &str, request_id: &str, timestamp: &str, input: u64, output: u64) -> Value {
    json!({
        "type": "assistant",
        "uuid": format!("a-{}", message_id),
        "timestamp": timestamp,
        "requestId": request_id,
        "message": {
            "id": message_id,
            "model": "claude-sonnet-4-5-20250929",
            "usage": {
                "input_tokens": input,
                "output_tokens": output,
                "cache_creation_input_tokens": 0,
                "cache_read_input_tokens": 0
            }
        }
    })
}

pub fn user_record(uuid: &str, timestamp: &str, text: &str) -> Value {
    json!({
        "type": "user",
        "uuid": uuid,
        "timestamp": timestamp,
        "message": { "role": "user", "content": [{ "type": "text", "text": text }] }
    })
}

pub fn with_parent(mut record: Value, parent_uuid: &str) -> Value {
    record["parentUuid"] = json!(parent_uuid);
    record
}
