//! Formatting of `list-backups` results

use crate::proto::BackupRecord;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::object::Segment;
use tabled::settings::{Padding, Style};

pub const DEFAULT_COLUMNS: &[&str] = &["id", "time", "job", "destination", "size"];

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Human readable size with 1024-based units, at most two decimals
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Value of one column for a record. `extra.a.b` walks into the extra object.
pub fn format_column(record: &BackupRecord, column: &str) -> String {
    match column {
        "id" => record.id.clone(),
        "time" => record.time.clone(),
        "job" => record.job.clone(),
        "destination" => record.destination.clone(),
        "size" => format_size(record.bytes),
        "bytes" => record.bytes.to_string(),
        other => match other.strip_prefix("extra.") {
            Some(path) => lookup_extra(record, path),
            None => String::new(),
        },
    }
}

fn lookup_extra(record: &BackupRecord, path: &str) -> String {
    let mut parts = path.split('.');
    let Some(first) = parts.next() else {
        return String::new();
    };

    let mut value = record.extra.get(first);
    for part in parts {
        value = match value {
            Some(Value::Object(map)) => map.get(part),
            Some(Value::Array(items)) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
    }

    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render records as an aligned table with a header row
pub fn format_table(records: &[BackupRecord], columns: &[String]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_uppercase()));
    for record in records {
        builder.push_record(columns.iter().map(|c| format_column(record, c)));
    }

    let mut table = builder.build();
    table
        .with(Style::empty())
        .modify(Segment::all(), Padding::new(0, 2, 0, 0));

    let mut output = String::new();
    for line in table.to_string().lines() {
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}
