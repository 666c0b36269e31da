//! Per-source pipeline: fetch, adapt, write.
//!
//! Each source runs independently; a failure in one never touches another.
//! Whatever happens, a source run ends in a [`SourceReport`].

use crate::adapters::{adapter_for, AdapterOptions, Extraction, RawDocument, SourceId};
use crate::config::{AppConfig, SourceConfig};
use crate::export::{write_records, OutputFormat};
use crate::fetch::Fetcher;
use crate::logger::RunProgress;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Counts and outcome of one source run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub seen: usize,
    pub skipped: usize,
    pub premium_skipped: usize,
    pub rows_written: usize,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SourceReport {
    fn started(source: SourceId) -> Self {
        let now = Utc::now();
        Self {
            source,
            seen: 0,
            skipped: 0,
            premium_skipped: 0,
            rows_written: 0,
            output: None,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    fn record_extraction(&mut self, extraction: &Extraction) {
        self.seen = extraction.stats.seen;
        self.skipped = extraction.stats.skipped;
        self.premium_skipped = extraction.stats.premium_skipped;
    }

    fn fail(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self.finish()
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Wall-clock time between start and finish.
    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().num_milliseconds() as f64 / 1000.0
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Adapt one document for `source`. Never fails; see [`crate::adapters::SourceAdapter::adapt`].
pub fn process_document(source: SourceId, options: &AdapterOptions, document: &RawDocument) -> Extraction {
    let adapter = adapter_for(source, options);
    let extraction = adapter.adapt(document);
    info!(
        "{}: {} entities seen, {} skipped, {} premium, {} rows",
        source,
        extraction.stats.seen,
        extraction.stats.skipped,
        extraction.stats.premium_skipped,
        extraction.records.len()
    );
    extraction
}

/// Output path for a source: `output_file` under `output_dir`, with its
/// extension switched when an explicit format overrides it.
pub fn output_path(output_dir: &Path, config: &SourceConfig, format: Option<OutputFormat>) -> (PathBuf, OutputFormat) {
    let path = output_dir.join(&config.output_file);
    match format {
        Some(format) if OutputFormat::from_path(&path) != Some(format) => {
            (path.with_extension(format.extension()), format)
        }
        Some(format) => (path, format),
        None => (path, config.output_format()),
    }
}

/// Fetch, adapt and write one source.
pub async fn run_source(
    fetcher: &Fetcher,
    source: SourceId,
    config: &SourceConfig,
    format: Option<OutputFormat>,
    output_dir: &Path,
) -> SourceReport {
    let report = SourceReport::started(source);

    let document = match fetcher.fetch(config).await {
        Ok(document) => document,
        Err(e) => {
            error!("{}: fetch failed: {}", source, e);
            return report.fail(e);
        }
    };

    let extraction = process_document(source, &config.adapter_options(), &document);
    let (path, format) = output_path(output_dir, config, format);
    write_extraction(report, &extraction, &path, format)
}

fn write_extraction(mut report: SourceReport, extraction: &Extraction, path: &Path, format: OutputFormat) -> SourceReport {
    report.record_extraction(extraction);
    match write_records(&extraction.records, report.source.schema(), path, format) {
        Ok(0) => report.finish(),
        Ok(written) => {
            report.rows_written = written;
            report.output = Some(path.to_path_buf());
            report.finish()
        }
        Err(e) => {
            error!("{}: write failed: {:#}", report.source, e);
            report.fail(format!("{:#}", e))
        }
    }
}

/// Run `sources` concurrently. Sources without a config entry are reported as failed.
pub async fn run_sources(
    config: &AppConfig,
    sources: &[SourceId],
    format: Option<OutputFormat>,
    output_dir: &Path,
    progress: &RunProgress,
) -> Result<Vec<SourceReport>> {
    let fetcher = Fetcher::new(&config.http).context("Failed to create HTTP client")?;
    let format = format.or(config.output.format);

    let runs = sources.iter().map(|&source| {
        let fetcher = &fetcher;
        async move {
            progress.start_source(source);
            let report = match config.source(source) {
                Some(source_config) => run_source(fetcher, source, source_config, format, output_dir).await,
                None => {
                    warn!("{}: no [sources.{}] table in configuration", source, source);
                    SourceReport::started(source).fail("source is not configured")
                }
            };
            progress.finish_source(&report);
            report
        }
    });

    Ok(join_all(runs).await)
}

/// Adapt a saved document offline and write the records.
pub fn parse_file(
    source: SourceId,
    options: &AdapterOptions,
    input: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<SourceReport> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let document = RawDocument::Text(String::from_utf8_lossy(&bytes).into_owned());

    let extraction = process_document(source, options, &document);
    let report = write_extraction(SourceReport::started(source), &extraction, output, format);
    if let Some(error) = &report.error {
        anyhow::bail!("{}: {}", source, error);
    }
    Ok(report)
}
