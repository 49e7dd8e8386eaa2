use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use claude_usage_monitor::config::get_config;
use claude_usage_monitor::display::DisplayManager;
use claude_usage_monitor::logging::init_logging;
use claude_usage_monitor::pricing::PricingCalculator;
use claude_usage_monitor::{
    ClaudeUsageAnalyzer, CostMode, LoadOptions, PatchOutcome, TokenCounts, UsageEntry, UsageLog, UsageSummary,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "claude-usage-monitor")]
#[command(about = "Normalize Claude usage logs into canonical usage entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct IngestArgs {
    /// Data root to scan for *.jsonl logs (default: ~/.claude/projects)
    #[arg(long)]
    path: Option<PathBuf>,
    /// Only include records from the last N hours (0 disables the cutoff)
    #[arg(long)]
    hours: Option<u32>,
    /// Cost mode: auto, calculate or provided
    #[arg(long)]
    mode: Option<CostMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show normalized usage entries
    Entries {
        #[command(flatten)]
        ingest: IngestArgs,
        /// Also print the raw records that passed the filters
        #[arg(long)]
        raw: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Show last N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show totals with a per-model breakdown
    Summary {
        #[command(flatten)]
        ingest: IngestArgs,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Dump every parseable raw record as JSON lines
    Raw {
        /// Data root to scan (default: ~/.claude/projects)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Append one usage entry to the usage log
    Log {
        #[arg(long)]
        model: String,
        #[arg(long)]
        input: u64,
        #[arg(long)]
        output: u64,
        #[arg(long, default_value_t = 0)]
        cache_creation: u64,
        #[arg(long, default_value_t = 0)]
        cache_read: u64,
        /// Cost in USD (computed from tokens when omitted)
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long, default_value = "")]
        message_id: String,
        #[arg(long, default_value = "")]
        request_id: String,
        #[arg(long)]
        keyword: Option<String>,
        /// Write to this file instead of the default usage log
        #[arg(long)]
        log_path: Option<PathBuf>,
    },
    /// Add or replace the keyword of a logged message
    Tag {
        message_id: String,
        keyword: String,
        /// Patch this file instead of the default usage log
        #[arg(long)]
        log_path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = get_config();
    let _log_guard = init_logging(&config.logging, &config.paths.log_directory);

    let json = matches!(
        cli.command,
        Commands::Entries { json: true, .. } | Commands::Summary { json: true, .. }
    );

    if let Err(e) = run(cli.command) {
        handle_error(e, json);
    }
}

fn run(command: Commands) -> Result<()> {
    let display = DisplayManager::new();

    match command {
        Commands::Entries { ingest, raw, json, limit } => {
            let options = LoadOptions {
                include_raw: raw,
                ..load_options(ingest)
            };
            let result = ClaudeUsageAnalyzer::new().load(&options);

            display.display_entries(&result.entries, limit, json)?;
            if let Some(raw_entries) = result.raw_entries {
                display.display_raw(&raw_entries)?;
            }
            Ok(())
        }
        Commands::Summary { ingest, json } => {
            let result = ClaudeUsageAnalyzer::new().load(&load_options(ingest));
            display.display_summary(&UsageSummary::from_entries(&result.entries), json)
        }
        Commands::Raw { path } => {
            let path = path.or_else(|| get_config().ingest.data_path.clone());
            display.display_raw(&ClaudeUsageAnalyzer::new().load_raw(path.as_deref()))
        }
        Commands::Log {
            model,
            input,
            output,
            cache_creation,
            cache_read,
            cost,
            message_id,
            request_id,
            keyword,
            log_path,
        } => {
            let tokens = TokenCounts {
                input_tokens: input,
                output_tokens: output,
                cache_creation_tokens: cache_creation,
                cache_read_tokens: cache_read,
            };
            let cost_usd = cost.unwrap_or_else(|| PricingCalculator::new().calculate_cost_from_tokens(&tokens, &model));

            let entry = UsageEntry {
                timestamp: Utc::now(),
                input_tokens: input,
                output_tokens: output,
                cache_creation_tokens: cache_creation,
                cache_read_tokens: cache_read,
                cost_usd,
                model,
                message_id,
                request_id,
                keyword: keyword.filter(|k| !k.is_empty()),
                text: None,
            };

            let log = log_path.map(UsageLog::at).unwrap_or_default();
            if !log.append(&entry) {
                anyhow::bail!("Failed to write usage entry");
            }
            if let Some(path) = log.append_path() {
                println!("Logged usage entry to {}", path.display());
            }
            Ok(())
        }
        Commands::Tag {
            message_id,
            keyword,
            log_path,
        } => {
            let log = log_path.map(UsageLog::at).unwrap_or_default();
            match log.add_keyword(&message_id, &keyword) {
                PatchOutcome::Updated => {
                    println!("Added keyword '{}' to message {}", keyword, message_id);
                    Ok(())
                }
                outcome => anyhow::bail!("Could not tag message {}: {}", message_id, outcome),
            }
        }
    }
}

/// Merge command-line ingest flags over the configured defaults.
fn load_options(args: IngestArgs) -> LoadOptions {
    let ingest = &get_config().ingest;
    LoadOptions {
        data_path: args.path.or_else(|| ingest.data_path.clone()),
        hours_back: args.hours.or(ingest.hours_back),
        mode: args.mode.unwrap_or(ingest.cost_mode),
        include_raw: false,
        parallel: ingest.parallel,
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
