//! Issue loading from JSON exports.
//!
//! The issue-source client is external; it hands over a JSON array of issue
//! records. Each record is decoded on its own so one malformed entry is logged
//! and skipped instead of failing the batch.

use crate::error::{Error, Result};
use crate::types::Issue;
use serde_json::Value;
use std::path::Path;

/// Parse a JSON array of issue records, skipping the ones that cannot be used.
pub fn parse_issues(json: &str) -> Result<Vec<Issue>> {
    let value: Value = serde_json::from_str(json)?;
    let records = match value {
        Value::Array(records) => records,
        other => {
            return Err(Error::Validation(format!(
                "expected a JSON array of issues, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = records.len();
    let mut issues = Vec::with_capacity(total);
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Issue>(record) {
            Ok(issue) if !issue.id.trim().is_empty() => issues.push(issue),
            Ok(_) => {
                tracing::warn!(index, "Skipping issue record with an empty id");
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed issue record");
            }
        }
    }

    if issues.len() < total {
        tracing::info!(
            loaded = issues.len(),
            skipped = total - issues.len(),
            "Loaded issues with some records skipped"
        );
    }
    Ok(issues)
}

/// Read and parse an issue export from disk.
pub fn load_issues(path: &Path) -> Result<Vec<Issue>> {
    let contents = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "Loading issues");
    parse_issues(&contents)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
