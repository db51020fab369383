// crates/lmine-cli/src/output.rs
//
// Output formatting utilities for the lmine CLI.
// Supports table and JSON output modes.

use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

use chrono::{DateTime, Utc};
use lmine_core::Timestamp;

use crate::error::CliError;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    #[default]
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    /// `--json` on the command line overrides the configured format.
    pub fn resolve(configured: OutputFormat, json_flag: bool) -> Self {
        if json_flag {
            OutputFormat::Json
        } else {
            configured
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Render a unix timestamp as RFC 3339.
pub fn format_time(time: Timestamp) -> Result<String, CliError> {
    let secs = i64::try_from(time).map_err(|_| CliError::Timestamp(time))?;
    let datetime = DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CliError::Timestamp(time))?;
    Ok(datetime.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        name: &'static str,
        value: u64,
    }

    #[test]
    fn test_format_table_has_headers() {
        let table = format_table(&[Row { name: "alice", value: 7 }]);
        assert!(table.contains("name"));
        assert!(table.contains("alice"));
    }

    #[test]
    fn test_format_json() {
        let json = format_json(&Row { name: "bob", value: 3 });
        assert!(json.contains("\"value\": 3"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0).unwrap(), "1970-01-01T00:00:00+00:00");
        assert!(format_time(u64::MAX).is_err());
    }

    #[test]
    fn test_json_flag_overrides() {
        assert_eq!(OutputFormat::resolve(OutputFormat::Table, true), OutputFormat::Json);
        assert_eq!(OutputFormat::resolve(OutputFormat::Json, false), OutputFormat::Json);
    }
}
