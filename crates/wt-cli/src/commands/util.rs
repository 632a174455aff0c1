//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wt_core::Assignee;
use wt_core::leave::round_tenth;

/// Formats a number of seconds as `Xh Ym`, or `Ym` under an hour.
pub fn format_duration(seconds: i64) -> String {
    if seconds < 0 {
        return "0m".to_string();
    }
    let total_minutes = seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats a day count with one decimal.
pub fn format_days(days: f64) -> String {
    format!("{:.1}", round_tenth(days))
}

/// Comma-separated assignee names.
pub fn assignee_names(assignees: &[Assignee]) -> String {
    assignees
        .iter()
        .map(|a| a.user.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(-5), "0m");
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(150), "2m");
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(5400 + 125), "1h 32m");
    }

    #[test]
    fn test_format_days_rounds_to_tenth() {
        assert_eq!(format_days(2.0), "2.0");
        assert_eq!(format_days(14.0 * 11.0 / 12.0), "12.8");
    }
}
