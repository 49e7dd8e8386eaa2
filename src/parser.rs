use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Parses newline-delimited JSON usage logs.
pub struct LineParser;

impl LineParser {
    /// Parse one line. Blank or malformed lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Skipping malformed JSON line");
                None
            }
        }
    }

    /// Read every parseable record of a file, in line order.
    ///
    /// Only I/O failures are errors; a bad line (including invalid UTF-8) is skipped.
    pub fn parse_file(file_path: &Path) -> Result<Vec<Value>> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (index, chunk) in reader.split(b'\n').enumerate() {
            let bytes = chunk.with_context(|| {
                format!("Failed to read line {} of {}", index + 1, file_path.display())
            })?;
            let line = String::from_utf8_lossy(&bytes);
            if line.trim().is_empty() {
                continue;
            }

            match Self::parse_line(&line) {
                Some(value) => records.push(value),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(
                file = %file_path.display(),
                parsed = records.len(),
                skipped,
                "Skipped malformed lines"
            );
        }

        Ok(records)
    }
}
