//! Structured error reports.
//!
//! File-level failures are recovered at the file boundary; they are reported
//! here with enough context (path, operation, extra key/values) to diagnose
//! from JSON logs without aborting the batch.

use std::fmt::Display;
use std::path::Path;
use tracing::warn;

/// Report a failed file operation with standardized context.
pub fn report_file_error(
    error: &anyhow::Error,
    file_path: &Path,
    operation: &str,
    additional_context: &[(&str, &dyn Display)],
) {
    let context = additional_context
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ");

    warn!(
        component = "file_handler",
        file_path = %file_path.display(),
        operation,
        context = %context,
        error = %format!("{:#}", error),
        "File operation failed"
    );
}
