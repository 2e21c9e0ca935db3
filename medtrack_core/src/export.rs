//! CSV export of medications with their refill status.
//!
//! Each row pairs the stored record with its status snapshot as of the
//! export date.

use crate::{compute_status, Medication, Result};
use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    #[serde(rename = "Medication Name")]
    name: String,
    #[serde(rename = "Dosage")]
    dosage: String,
    #[serde(rename = "Frequency (per day)")]
    frequency: u32,
    #[serde(rename = "Start Date")]
    start_date: String,
    #[serde(rename = "Quantity Received")]
    quantity_received: u32,
    #[serde(rename = "Days Supply")]
    days_supply: u32,
    #[serde(rename = "Doses Remaining")]
    doses_remaining: u32,
    #[serde(rename = "Days Remaining")]
    days_remaining: u32,
    #[serde(rename = "Refill Date")]
    refill_date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Adherence %")]
    adherence: String,
}

impl CsvRow {
    fn new(medication: &Medication, today: NaiveDate) -> Self {
        let status = compute_status(medication, today);
        CsvRow {
            name: medication.name.clone(),
            dosage: medication.dosage_label(),
            frequency: medication.frequency,
            start_date: format_display_date(medication.start_date),
            quantity_received: medication.quantity_received,
            days_supply: medication.days_supply,
            doses_remaining: status.doses_remaining,
            days_remaining: status.days_remaining,
            refill_date: format_display_date(status.refill_date),
            status: status.status.to_string(),
            adherence: format!("{}%", status.adherence_percentage),
        }
    }
}

/// Format a date for display, e.g. `Mar 1, 2024`
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Write every medication as a CSV row (with headers) to `writer`
pub fn write_csv<W: Write>(writer: W, medications: &[Medication], today: NaiveDate) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    if medications.is_empty() {
        // serialize() emits headers lazily, so write them for an empty export
        writer.write_record([
            "Medication Name",
            "Dosage",
            "Frequency (per day)",
            "Start Date",
            "Quantity Received",
            "Days Supply",
            "Doses Remaining",
            "Days Remaining",
            "Refill Date",
            "Status",
            "Adherence %",
        ])?;
    }

    for medication in medications {
        writer.serialize(CsvRow::new(medication, today))?;
    }

    writer.flush()?;
    Ok(())
}

/// Export to `<dir>/<prefix>-<YYYY-MM-DD>.csv`, returning the written path
///
/// An existing export for the same day is replaced.
pub fn export_to_dir(
    dir: &Path,
    prefix: &str,
    medications: &[Medication],
    today: NaiveDate,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}-{}.csv", prefix, today.format("%Y-%m-%d")));

    let file = std::fs::File::create(&path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_csv(&mut writer, medications, today)?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} medications to {:?}", medications.len(), path);
    Ok(path)
}
