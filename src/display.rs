//! Output Formatting
//!
//! Human-readable terminal output with colors, and structured JSON output for
//! programmatic consumption. All functions write to stdout.
//!
//! ## Output Formats
//!
//! - **Entries**: one line per [`UsageEntry`], most recent last
//! - **Summary**: totals plus a per-model breakdown from [`UsageSummary`]
//! - **Raw**: one JSON object per line, as read from the logs
//!
//! JSON summaries use the camelCase field names of [`UsageSummary`]:
//! ```json
//! {
//!   "entries": 42,
//!   "totalTokens": 125000,
//!   "totalCost": 1.25,
//!   "models": { "claude-sonnet-4-5": { "entries": 42, "totalTokens": 125000, "totalCost": 1.25 } }
//! }
//! ```

use crate::models::{UsageEntry, UsageSummary};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;

const RULE_WIDTH: usize = 80;
const KEYWORD_COLUMN: usize = 24;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    /// Print entries, keeping only the last `limit` when given.
    pub fn display_entries(&self, entries: &[UsageEntry], limit: Option<usize>, json_output: bool) -> Result<()> {
        let shown = tail(entries, limit);

        if json_output {
            let json_str = serde_json::to_string_pretty(&shown).context("Error serializing entries to JSON")?;
            println!("{}", json_str);
            return Ok(());
        }

        self.print_header("Claude Usage Entries");

        if shown.is_empty() {
            println!("\n{} No usage entries found", "ℹ".bright_blue());
            return Ok(());
        }

        println!(
            "\n{} {} of {} entries\n",
            "📊".bright_yellow(),
            shown.len().to_string().bright_white().bold(),
            entries.len().to_string().bright_white().bold()
        );

        for entry in shown {
            let keyword = entry.keyword.as_deref().unwrap_or("-");
            println!(
                "{}  {:<28} {:>10} tok  {:>10}  {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().bright_white(),
                entry.model.bright_cyan(),
                entry.total_tokens().to_string().bright_white(),
                format!("${:.4}", entry.cost_usd).bright_green(),
                truncate_column(keyword, KEYWORD_COLUMN).bright_yellow()
            );
        }

        Ok(())
    }

    pub fn display_summary(&self, summary: &UsageSummary, json_output: bool) -> Result<()> {
        if json_output {
            let json_str = serde_json::to_string_pretty(summary).context("Error serializing summary to JSON")?;
            println!("{}", json_str);
            return Ok(());
        }

        self.print_header("Claude Usage Summary");

        println!("\n{} Total Usage Summary:", "📊".bright_yellow());
        println!("   Entries: {}", summary.entries.to_string().bright_white().bold());
        println!(
            "   Tokens: {} (input {}, output {}, cache write {}, cache read {})",
            summary.total_tokens.to_string().bright_white().bold(),
            summary.input_tokens,
            summary.output_tokens,
            summary.cache_creation_tokens,
            summary.cache_read_tokens
        );
        println!(
            "   Total Cost: {}",
            format!("${:.2}", summary.total_cost).bright_green().bold()
        );

        if let (Some(first), Some(last)) = (summary.first_activity, summary.last_activity) {
            println!(
                "   Activity: {} → {}",
                first.format("%Y-%m-%d %H:%M").to_string().bright_white(),
                last.format("%Y-%m-%d %H:%M").to_string().bright_white()
            );
        }

        if !summary.models.is_empty() {
            println!("\n{} By model:", "🤖".bright_blue());
            for (model, totals) in &summary.models {
                let percentage = if summary.total_cost > 0.0 {
                    totals.total_cost / summary.total_cost * 100.0
                } else {
                    0.0
                };
                println!(
                    "   {}: {} ({}%, {} entries, {} tokens)",
                    model.bright_cyan(),
                    format!("${:.2}", totals.total_cost).bright_green(),
                    format!("{:.0}", percentage).bright_yellow(),
                    totals.entries.to_string().bright_white(),
                    totals.total_tokens.to_string().bright_white()
                );
            }
        }

        println!();
        Ok(())
    }

    /// Print raw records as JSON lines.
    pub fn display_raw(&self, records: &[Value]) -> Result<()> {
        for record in records {
            println!("{}", serde_json::to_string(record).context("Error serializing raw record")?);
        }
        Ok(())
    }

    fn print_header(&self, title: &str) {
        println!("\n{}", "=".repeat(RULE_WIDTH).bright_cyan());
        println!("{}", title.bright_white().bold());
        println!("{}", "=".repeat(RULE_WIDTH).bright_cyan());
    }
}

fn tail<T>(items: &[T], limit: Option<usize>) -> &[T] {
    match limit {
        Some(n) if n < items.len() => &items[items.len() - n..],
        _ => items,
    }
}

fn truncate_column(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
