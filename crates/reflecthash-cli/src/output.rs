//! Output formatting utilities.

use serde_json::Value;

/// Formats a command result as pretty-printed JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
