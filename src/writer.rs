//! Usage log writer
//!
//! Appends canonical entries to the usage log and back-patches keywords onto
//! entries already written.
//!
//! Both operations take an exclusive per-path lock, so a keyword patch (a full
//! read-modify-rewrite) never interleaves with an append in this process. The
//! rewrite goes to a temporary file in the same directory that atomically
//! replaces the log only once it is complete; a failed patch leaves the
//! original untouched.

use crate::models::UsageEntry;
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

/// Preference-ordered default locations of the usage log.
pub fn default_log_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    vec![
        home.join(".claude").join("projects").join("usage.jsonl"),
        home.join(".claude").join("code").join("usage").join("usage.jsonl"),
        home.join("Library")
            .join("Application Support")
            .join("Claude")
            .join("code")
            .join("usage")
            .join("usage.jsonl"),
    ]
}

/// Result of a keyword patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one matching line was rewritten.
    Updated,
    /// No line carries the message id; the file was not touched.
    NotFound,
    /// None of the candidate log paths exists.
    NoLogFile,
    /// Reading or rewriting failed; the original file is unchanged.
    Failed,
}

impl PatchOutcome {
    pub fn is_success(self) -> bool {
        self == PatchOutcome::Updated
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PatchOutcome::Updated => "updated",
            PatchOutcome::NotFound => "message id not found",
            PatchOutcome::NoLogFile => "no usage log file found",
            PatchOutcome::Failed => "failed to update usage log",
        };
        f.write_str(text)
    }
}

/// On-disk shape of one appended entry. `keyword` is omitted when absent.
#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    model: &'a str,
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    cost_usd: f64,
    message_id: &'a str,
    request_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<&'a str>,
}

impl<'a> From<&'a UsageEntry> for LogLine<'a> {
    fn from(entry: &'a UsageEntry) -> Self {
        Self {
            timestamp: entry.timestamp.to_rfc3339(),
            model: &entry.model,
            input_tokens: entry.input_tokens,
            output_tokens: entry.output_tokens,
            cache_creation_tokens: entry.cache_creation_tokens,
            cache_read_tokens: entry.cache_read_tokens,
            cost_usd: entry.cost_usd,
            message_id: &entry.message_id,
            request_id: &entry.request_id,
            keyword: entry.keyword.as_deref().filter(|k| !k.is_empty()),
        }
    }
}

/// The usage log, resolved from a preference-ordered list of candidate paths.
#[derive(Debug, Clone)]
pub struct UsageLog {
    candidates: Vec<PathBuf>,
}

impl Default for UsageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageLog {
    pub fn new() -> Self {
        Self::with_candidates(default_log_paths())
    }

    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// A log at exactly one path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::with_candidates(vec![path.into()])
    }

    /// Where appends go: the first candidate whose directory exists, else the first candidate.
    pub fn append_path(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|path| path.parent().is_some_and(Path::exists))
            .or_else(|| self.candidates.first())
            .cloned()
    }

    /// Where patches read from: the first candidate that exists.
    pub fn existing_path(&self) -> Option<PathBuf> {
        self.candidates.iter().find(|path| path.is_file()).cloned()
    }

    /// Append one entry. Failure is logged and reported as `false`.
    pub fn append(&self, entry: &UsageEntry) -> bool {
        let Some(path) = self.append_path() else {
            error!("No usage log path configured");
            return false;
        };

        match append_line(&path, entry) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    message_id = %entry.message_id,
                    keyword = entry.keyword.as_deref().unwrap_or("(none)"),
                    "Logged usage entry"
                );
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{:#}", e), "Failed to write usage entry");
                false
            }
        }
    }

    /// Set `keyword` on every logged line whose message id matches.
    pub fn add_keyword(&self, message_id: &str, keyword: &str) -> PatchOutcome {
        let Some(path) = self.existing_path() else {
            warn!("No usage log file found in known paths");
            return PatchOutcome::NoLogFile;
        };

        match patch_keyword(&path, message_id, keyword) {
            Ok(0) => {
                warn!(path = %path.display(), message_id, "Message id not found in log");
                PatchOutcome::NotFound
            }
            Ok(patched) => {
                info!(path = %path.display(), message_id, keyword, patched, "Added keyword to message");
                PatchOutcome::Updated
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{:#}", e), "Failed to update log");
                PatchOutcome::Failed
            }
        }
    }
}

/// Append `entry` to the default usage log, or to `log_path` when given.
pub fn log_usage_entry(entry: &UsageEntry, log_path: Option<&Path>) -> bool {
    match log_path {
        Some(path) => UsageLog::at(path).append(entry),
        None => UsageLog::new().append(entry),
    }
}

/// Add or update the keyword of a message in the default usage log.
pub fn add_keyword_to_existing_entry(message_id: &str, keyword: &str) -> PatchOutcome {
    UsageLog::new().add_keyword(message_id, keyword)
}

fn append_line(path: &Path, entry: &UsageEntry) -> Result<()> {
    let mut line = serde_json::to_string(&LogLine::from(entry)).context("Failed to serialize entry")?;
    line.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let lock = log_lock(path);
    let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    Ok(())
}

/// Rewrite the log with `keyword` set on matching lines. Returns how many
/// lines were patched; zero means the file was not written.
fn patch_keyword(path: &Path, message_id: &str, keyword: &str) -> Result<usize> {
    let lock = log_lock(path);
    let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let original = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut rewritten = Vec::with_capacity(original.len() + keyword.len());
    let mut patched = 0usize;

    for line in original.split_inclusive(|b| *b == b'\n') {
        match patched_line(line, message_id, keyword) {
            Some(replacement) => {
                rewritten.extend_from_slice(&replacement);
                patched += 1;
            }
            None => rewritten.extend_from_slice(line),
        }
    }

    if patched == 0 {
        return Ok(0);
    }

    replace_atomically(path, &rewritten)?;
    Ok(patched)
}

/// The replacement for `line` when it is the patch target, else `None`.
/// Line terminators are preserved.
fn patched_line(line: &[u8], message_id: &str, keyword: &str) -> Option<Vec<u8>> {
    let body_len = line
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map_or(0, |pos| pos + 1);
    let (body, terminator) = line.split_at(body_len);

    let mut value: Value = serde_json::from_slice(body).ok()?;
    if logged_message_id(&value)? != message_id {
        return None;
    }

    value
        .as_object_mut()?
        .insert("keyword".to_string(), Value::String(keyword.to_string()));

    let mut replacement = serde_json::to_vec(&value).ok()?;
    replacement.extend_from_slice(terminator);
    Some(replacement)
}

fn logged_message_id(value: &Value) -> Option<&str> {
    value
        .get("message_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .or_else(|| value.get("message")?.get("id")?.as_str())
}

fn replace_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(contents).context("Failed to write temporary file")?;
    temp.as_file().sync_all().context("Failed to sync temporary file")?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .context("Failed to copy log permissions")?;
    }

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Exclusive in-process lock for one log path.
fn log_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<DashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();

    LOCKS
        .get_or_init(DashMap::new)
        .entry(lock_key(path))
        .or_default()
        .clone()
}

fn lock_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
