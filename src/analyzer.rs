//! Usage Ingestion Pipeline
//!
//! This module orchestrates the whole ingestion pipeline and is the primary
//! entry point for consumers of normalized usage data.
//!
//! ## Data Processing Pipeline
//! 1. **Discovery**: Finds every `*.jsonl` file under the data root
//! 2. **Parsing**: Reads each file line by line, skipping malformed lines
//! 3. **Linking**: Attaches user prompt text to assistant records (per file)
//! 4. **Filtering**: Drops records older than the recency cutoff
//! 5. **Mapping**: Builds canonical [`UsageEntry`] values with cost and keyword
//! 6. **Deduplication**: Keeps the first mapped entry per `(message_id, request_id)`
//! 7. **Sorting**: Orders the full result ascending by timestamp
//!
//! Files are independent until step 6. With the `parallel` feature, steps 2-5
//! run concurrently per file and the results are merged in discovery order, so
//! the output is identical to the sequential path. Nothing is returned before
//! every file has been merged.
//!
//! ## Usage Example
//!
//! ```no_run
//! use claude_usage_monitor::{load_usage_entries, CostMode};
//!
//! let (entries, _raw) = load_usage_entries(None, Some(24), CostMode::Auto, false);
//! println!("{} entries in the last 24 hours", entries.len());
//! ```

use crate::dedup::DedupSet;
use crate::error_reporting::report_file_error;
use crate::file_discovery::FileDiscovery;
use crate::linker::MessageLinker;
use crate::mapper::EntryMapper;
use crate::models::{CostMode, UsageEntry};
use crate::parser::LineParser;
use crate::pricing::PricingCalculator;
use crate::record::LogRecord;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Inputs of one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Root directory to scan; defaults to `~/.claude/projects`.
    pub data_path: Option<PathBuf>,
    /// Keep only records from the last N hours. `None` or `0` disables the cutoff.
    pub hours_back: Option<u32>,
    pub mode: CostMode,
    /// Also return the raw records that passed the filters.
    pub include_raw: bool,
    /// Process files concurrently (requires the `parallel` feature).
    pub parallel: bool,
}

/// Output of one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    /// Entries sorted ascending by timestamp.
    pub entries: Vec<UsageEntry>,
    /// Raw records in file-then-line order, when requested.
    pub raw_entries: Option<Vec<Value>>,
    pub files_processed: usize,
    pub files_failed: usize,
}

/// A record that survived the per-file stages, awaiting the dedup merge.
struct Candidate {
    key: Option<String>,
    entry: Option<UsageEntry>,
    raw: Option<Value>,
}

pub struct ClaudeUsageAnalyzer {
    pricing: PricingCalculator,
}

impl Default for ClaudeUsageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaudeUsageAnalyzer {
    pub fn new() -> Self {
        Self {
            pricing: PricingCalculator::new(),
        }
    }

    /// Run discovery, per-file parse/link/filter/map, dedup and the global sort.
    pub fn load(&self, options: &LoadOptions) -> LoadResult {
        let root = resolve_data_path(options.data_path.as_deref());
        let span = info_span!("ingest", run_id = %Uuid::new_v4(), root = %root.display());
        let _guard = span.enter();

        let cutoff = cutoff_time(options.hours_back);
        let files = FileDiscovery::find_jsonl_files(&root);
        let mut result = LoadResult {
            raw_entries: options.include_raw.then(Vec::new),
            ..Default::default()
        };

        if files.is_empty() {
            warn!(path = %root.display(), "No JSONL files found");
            return result;
        }

        let mut dedup = DedupSet::new();
        for (file_path, batch) in self.process_files(&files, options, cutoff) {
            match batch {
                Ok(candidates) => {
                    result.files_processed += 1;
                    merge_candidates(candidates, &mut dedup, &mut result);
                }
                Err(e) => {
                    result.files_failed += 1;
                    let exists = file_path.exists();
                    report_file_error(&e, file_path, "read", &[("file_exists", &exists)]);
                }
            }
        }

        result.entries.sort_by_key(|entry| entry.timestamp);

        info!(
            entries = result.entries.len(),
            files = files.len(),
            failed = result.files_failed,
            unique_ids = dedup.len(),
            "Processed usage entries"
        );
        result
    }

    #[cfg(feature = "parallel")]
    fn process_files<'f>(
        &self,
        files: &'f [PathBuf],
        options: &LoadOptions,
        cutoff: Option<DateTime<Utc>>,
    ) -> Vec<(&'f Path, Result<Vec<Candidate>>)> {
        use rayon::prelude::*;

        if options.parallel {
            return files
                .par_iter()
                .map(|path| (path.as_path(), self.process_single_file(path, options, cutoff)))
                .collect();
        }
        self.process_files_sequential(files, options, cutoff)
    }

    #[cfg(not(feature = "parallel"))]
    fn process_files<'f>(
        &self,
        files: &'f [PathBuf],
        options: &LoadOptions,
        cutoff: Option<DateTime<Utc>>,
    ) -> Vec<(&'f Path, Result<Vec<Candidate>>)> {
        if options.parallel {
            debug!("Parallel processing requested but the `parallel` feature is disabled");
        }
        self.process_files_sequential(files, options, cutoff)
    }

    fn process_files_sequential<'f>(
        &self,
        files: &'f [PathBuf],
        options: &LoadOptions,
        cutoff: Option<DateTime<Utc>>,
    ) -> Vec<(&'f Path, Result<Vec<Candidate>>)> {
        files
            .iter()
            .map(|path| (path.as_path(), self.process_single_file(path, options, cutoff)))
            .collect()
    }

    /// Parse, link, filter and map one file. Only I/O failures are errors.
    fn process_single_file(
        &self,
        file_path: &Path,
        options: &LoadOptions,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candidate>> {
        let (raws, mut records): (Vec<Value>, Vec<LogRecord>) = LineParser::parse_file(file_path)?
            .into_iter()
            .filter_map(|raw| LogRecord::from_value(&raw).map(|record| (raw, record)))
            .unzip();

        let linked = MessageLinker::link(&mut records);
        let mapper = EntryMapper::new(&self.pricing, options.mode);

        let mut candidates = Vec::with_capacity(records.len());
        let mut filtered = 0usize;
        for (raw, record) in raws.into_iter().zip(records) {
            if is_before_cutoff(&record, cutoff) {
                filtered += 1;
                continue;
            }
            candidates.push(Candidate {
                key: record.dedup_key(),
                entry: mapper.map(&record),
                raw: options.include_raw.then_some(raw),
            });
        }

        debug!(
            file = %file_path.display(),
            candidates = candidates.len(),
            filtered,
            linked,
            "Processed file"
        );
        Ok(candidates)
    }

    /// Load every parseable raw record without linking, filtering or mapping.
    pub fn load_raw(&self, data_path: Option<&Path>) -> Vec<Value> {
        let root = resolve_data_path(data_path);
        let mut all_raw = Vec::new();

        for file_path in FileDiscovery::find_jsonl_files(&root) {
            match LineParser::parse_file(&file_path) {
                Ok(records) => all_raw.extend(records),
                Err(e) => {
                    let exists = file_path.exists();
                    report_file_error(&e, &file_path, "read", &[("file_exists", &exists)]);
                }
            }
        }

        all_raw
    }
}

/// Apply the dedup rule in file-then-line order: a duplicate is skipped before
/// it is considered; an identity is recorded only after a successful map.
fn merge_candidates(candidates: Vec<Candidate>, dedup: &mut DedupSet, result: &mut LoadResult) {
    for candidate in candidates {
        if dedup.is_duplicate(candidate.key.as_deref()) {
            continue;
        }
        if let Some(entry) = candidate.entry {
            result.entries.push(entry);
            dedup.mark_processed(candidate.key);
        }
        if let (Some(raw_entries), Some(raw)) = (result.raw_entries.as_mut(), candidate.raw) {
            raw_entries.push(raw);
        }
    }
}

fn is_before_cutoff(record: &LogRecord, cutoff: Option<DateTime<Utc>>) -> bool {
    match (cutoff, record.timestamp) {
        (Some(cutoff), Some(timestamp)) => timestamp < cutoff,
        _ => false,
    }
}

fn cutoff_time(hours_back: Option<u32>) -> Option<DateTime<Utc>> {
    hours_back
        .filter(|hours| *hours > 0)
        .map(|hours| Utc::now() - Duration::hours(i64::from(hours)))
}

/// Default data root: `~/.claude/projects`.
pub fn default_data_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("projects")
}

fn resolve_data_path(data_path: Option<&Path>) -> PathBuf {
    data_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_data_path)
}

/// Load, link, filter, map, dedup and sort every usage entry under `data_path`.
///
/// Returns the sorted entries and, when `include_raw` is set, the raw records
/// that passed the filters.
pub fn load_usage_entries(
    data_path: Option<&Path>,
    hours_back: Option<u32>,
    mode: CostMode,
    include_raw: bool,
) -> (Vec<UsageEntry>, Option<Vec<Value>>) {
    let options = LoadOptions {
        data_path: data_path.map(Path::to_path_buf),
        hours_back,
        mode,
        include_raw,
        parallel: false,
    };
    let result = ClaudeUsageAnalyzer::new().load(&options);
    (result.entries, result.raw_entries)
}

/// Load all raw JSONL records without processing.
pub fn load_all_raw_entries(data_path: Option<&Path>) -> Vec<Value> {
    ClaudeUsageAnalyzer::new().load_raw(data_path)
}
