use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use time::{Date, format_description};

use crate::core::db::ActivityEntry;

pub const CSV_HEADERS: [&str; 5] = ["Plate Number", "Region", "Status", "Timestamp", "Confidence (%)"];

const TIMESTAMP_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// Suggested file name for an export made on `date`
pub fn export_file_name(date: Date) -> String {
    format!(
        "plate-detection-log-{:04}-{:02}-{:02}.csv",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Write entries as CSV, one row per entry in the given order.
///
/// An empty log is refused rather than producing a header-only file.
pub fn export_csv<W: Write>(entries: &[ActivityEntry], writer: W) -> Result<()> {
    anyhow::ensure!(!entries.is_empty(), "Activity log is empty, nothing to export");

    let timestamp_format = format_description::parse(TIMESTAMP_FORMAT)?;
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for entry in entries {
        let timestamp = entry.timestamp.format(&timestamp_format)?;
        let confidence = format!("{:.1}", entry.confidence);
        wtr.write_record([
            entry.plate_number.as_str(),
            entry.region.as_str(),
            if entry.is_legal { "Legal" } else { "Illegal" },
            timestamp.as_str(),
            confidence.as_str(),
        ])
        .with_context(|| format!("Failed to write activity {}", entry.id))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export to a file at `path`. Nothing is created when the log is empty.
pub fn export_to_path(entries: &[ActivityEntry], path: &Path) -> Result<()> {
    anyhow::ensure!(!entries.is_empty(), "Activity log is empty, nothing to export");
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    export_csv(entries, file)
}
