//! Core Data Models
//!
//! This module defines the canonical data structures produced by the ingestion
//! pipeline and consumed by summaries, the CLI and any external presentation layer.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: one JSON object per log line, decoded into a
//!    [`crate::record::LogRecord`]
//! 2. **Canonical**: [`UsageEntry`] - one billable model invocation
//! 3. **Aggregation**: [`UsageSummary`] - totals over a list of entries
//!
//! ## Core Types
//!
//! - [`UsageEntry`] - Canonical usage record with tokens, cost and metadata
//! - [`TokenCounts`] - The four billable token counters
//! - [`CostMode`] - Policy for trusting or deriving an entry's cost
//! - [`UsageSummary`] / [`ModelSummary`] - Aggregated totals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Model name used when a record carries none.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Request id used when a record carries none.
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_creation_tokens)
            .saturating_add(self.cache_read_tokens)
    }

    /// True when every counter is zero (non-billable record).
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_creation_tokens == 0
            && self.cache_read_tokens == 0
    }
}

/// Canonical record of one billable model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub timestamp: DateTime<Utc>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost_usd: f64,
    pub model: String,
    pub message_id: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Full linked prompt text. Preview only, never part of identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl UsageEntry {
    pub fn tokens(&self) -> TokenCounts {
        TokenCounts {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cache_creation_tokens: self.cache_creation_tokens,
            cache_read_tokens: self.cache_read_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens().total()
    }
}

/// How the monetary cost of an entry is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    /// Supplied cost when present, otherwise derived from tokens.
    #[default]
    Auto,
    /// Always derived from tokens and the model rate table.
    Calculate,
    /// Always the supplied cost, 0 when absent.
    #[serde(alias = "provided", alias = "cached", alias = "display")]
    UseProvided,
}

impl FromStr for CostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(CostMode::Auto),
            "calculate" => Ok(CostMode::Calculate),
            "provided" | "use_provided" | "use-provided" | "cached" | "display" => {
                Ok(CostMode::UseProvided)
            }
            other => Err(format!(
                "invalid cost mode '{}', expected auto, calculate or provided",
                other
            )),
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CostMode::Auto => "auto",
            CostMode::Calculate => "calculate",
            CostMode::UseProvided => "provided",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelSummary {
    pub entries: usize,
    #[serde(rename = "totalTokens")]
    pub total_tokens: u64,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
}

/// Totals over a list of usage entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub entries: usize,
    #[serde(rename = "inputTokens")]
    pub input_tokens: u64,
    #[serde(rename = "outputTokens")]
    pub output_tokens: u64,
    #[serde(rename = "cacheCreationTokens")]
    pub cache_creation_tokens: u64,
    #[serde(rename = "cacheReadTokens")]
    pub cache_read_tokens: u64,
    #[serde(rename = "totalTokens")]
    pub total_tokens: u64,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
    #[serde(rename = "firstActivity")]
    pub first_activity: Option<DateTime<Utc>>,
    #[serde(rename = "lastActivity")]
    pub last_activity: Option<DateTime<Utc>>,
    pub models: BTreeMap<String, ModelSummary>,
}

impl UsageSummary {
    pub fn from_entries(entries: &[UsageEntry]) -> Self {
        let mut summary = UsageSummary::default();

        for entry in entries {
            summary.entries += 1;
            summary.input_tokens = summary.input_tokens.saturating_add(entry.input_tokens);
            summary.output_tokens = summary.output_tokens.saturating_add(entry.output_tokens);
            summary.cache_creation_tokens = summary
                .cache_creation_tokens
                .saturating_add(entry.cache_creation_tokens);
            summary.cache_read_tokens = summary.cache_read_tokens.saturating_add(entry.cache_read_tokens);
            summary.total_tokens = summary.total_tokens.saturating_add(entry.total_tokens());
            summary.total_cost += entry.cost_usd;

            summary.first_activity = Some(match summary.first_activity {
                Some(first) => first.min(entry.timestamp),
                None => entry.timestamp,
            });
            summary.last_activity = Some(match summary.last_activity {
                Some(last) => last.max(entry.timestamp),
                None => entry.timestamp,
            });

            let model = summary.models.entry(entry.model.clone()).or_default();
            model.entries += 1;
            model.total_tokens = model.total_tokens.saturating_add(entry.total_tokens());
            model.total_cost += entry.cost_usd;
        }

        summary
    }
}
