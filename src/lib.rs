//! Claude Usage Monitor Library
//!
//! Ingests Claude usage logs stored as newline-delimited JSON and normalizes
//! them into canonical [`UsageEntry`] records: one per billable model
//! invocation, with token counts, cost, identity and an optional keyword.
//! It also appends entries to the local usage log and patches keywords onto
//! logged entries.
//!
//! ## Pipeline
//!
//! For each `*.jsonl` file under the data root, in sorted path order:
//!
//! 1. [`parser`] reads lines, skipping blank and malformed ones
//! 2. [`record`] decodes each object into a typed [`record::LogRecord`]
//! 3. [`linker`] attaches user prompt text to the assistant replies
//! 4. the recency cutoff and [`dedup`] filter drop stale and repeated records
//! 5. [`mapper`] builds the entry, pricing it through [`pricing`]
//!
//! [`analyzer`] orchestrates the above and sorts the final list by timestamp.
//! [`writer`] owns the usage log on disk.
//!
//! ## Main Entry Point
//!
//! ```no_run
//! use claude_usage_monitor::{load_usage_entries, CostMode, UsageSummary};
//!
//! let (entries, _raw) = load_usage_entries(None, Some(24), CostMode::Auto, false);
//! let summary = UsageSummary::from_entries(&entries);
//! println!("{} entries, ${:.2}", summary.entries, summary.total_cost);
//! ```
//!
//! Errors in individual lines or files never abort a run; they are skipped
//! and reported through `tracing`.

pub mod analyzer;
pub mod config;
pub mod dedup;
pub mod display;
pub mod error_reporting;
pub mod file_discovery;
pub mod linker;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod record;
pub mod timestamp_parser;
pub mod writer;

pub use analyzer::{load_all_raw_entries, load_usage_entries, ClaudeUsageAnalyzer, LoadOptions, LoadResult};
pub use models::*;
pub use writer::{add_keyword_to_existing_entry, log_usage_entry, PatchOutcome, UsageLog};
