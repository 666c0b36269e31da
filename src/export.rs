use crate::pipeline::SourceReport;
use crate::record::{NormalizedRecord, Schema};
use anyhow::{Context, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write `records` to `path` in `format`, returning the number of rows written.
///
/// Zero records writes nothing and returns 0; a file left at `path` by an
/// earlier run is removed so it cannot pass for this run's output. Parent
/// directories are created.
pub fn write_records(
    records: &[NormalizedRecord],
    schema: Schema,
    path: &Path,
    format: OutputFormat,
) -> Result<usize> {
    if records.is_empty() {
        if path.is_file() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale output {}", path.display()))?;
            warn!("No records to write, removed stale output {}", path.display());
        } else {
            warn!("No records to write, skipping {}", path.display());
        }
        return Ok(0);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    match format {
        OutputFormat::Csv => export_csv(records, schema, path)?,
        OutputFormat::Json => export_json(records, path)?,
    }
    Ok(records.len())
}

pub fn export_csv(records: &[NormalizedRecord], schema: Schema, output_path: &Path) -> Result<()> {
    debug!("Exporting {} records to CSV: {}", records.len(), output_path.display());

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(schema)?;
    for record in records {
        wtr.write_record(record.to_csv_row())?;
    }

    wtr.flush()?;
    info!("Exported {} records to CSV: {}", records.len(), output_path.display());

    Ok(())
}

pub fn export_json(records: &[NormalizedRecord], output_path: &Path) -> Result<()> {
    debug!("Exporting {} records to JSON: {}", records.len(), output_path.display());

    let json_string = serde_json::to_string_pretty(records)?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    file.write_all(json_string.as_bytes())?;
    file.write_all(b"\n")?;

    info!("Exported {} records to JSON: {}", records.len(), output_path.display());

    Ok(())
}

/// Write the per-source reports of a run as a JSON array.
pub fn write_run_report(reports: &[SourceReport], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }

    let json_string = serde_json::to_string_pretty(reports)?;
    fs::write(path, format!("{}\n", json_string))
        .with_context(|| format!("Failed to write run report {}", path.display()))?;

    info!("Wrote run report for {} source(s): {}", reports.len(), path.display());
    Ok(())
}

pub fn print_run_summary(reports: &[SourceReport]) {
    if reports.is_empty() {
        println!("No sources were run.");
        return;
    }

    println!("\n=== Run Summary ===");
    println!(
        "{:<14} {:>6} {:>8} {:>8} {:>6} {:>8}  {}",
        "source", "seen", "skipped", "premium", "rows", "time", "output"
    );
    for report in reports {
        let outcome = match (&report.error, &report.output) {
            (Some(error), _) => format!("FAILED: {}", error),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => "(nothing written)".to_string(),
        };
        println!(
            "{:<14} {:>6} {:>8} {:>8} {:>6} {:>7.2}s  {}",
            report.source.as_str(),
            report.seen,
            report.skipped,
            report.premium_skipped,
            report.rows_written,
            report.elapsed_secs(),
            outcome
        );
    }

    let total_rows: usize = reports.iter().map(|r| r.rows_written).sum();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    println!("Total rows written: {}", total_rows);
    if failed > 0 {
        println!("Sources failed: {}", failed);
    }
    println!("===================\n");
}
