use crate::adapters::SourceId;
use crate::pipeline::SourceReport;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Summary = 1,   // Per-source outcomes and warnings (default)
    Detailed = 2,  // Counts, output paths, fetch details
    Debug = 3,     // Everything, including premium-row skips
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Default filter directive when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Summary => "partnerscraper=warn",
            VerbosityLevel::Detailed => "partnerscraper=info",
            VerbosityLevel::Debug => "partnerscraper=debug,reqwest=debug",
        }
    }
}

/// Install the global tracing subscriber: stderr, plus `log_file` when given.
///
/// `RUST_LOG` overrides the verbosity-derived filter.
pub fn init_logging(verbosity: VerbosityLevel, log_file: Option<&Path>) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}

/// Progress over the sources of one run.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new(total_sources: u64) -> Self {
        let bar = ProgressBar::new(total_sources);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sources {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Self { bar }
    }

    /// A progress tracker that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn start_source(&self, source: SourceId) {
        self.bar.set_message(format!("fetching {}", source));
    }

    pub fn finish_source(&self, report: &SourceReport) {
        let status = if report.is_success() { "done" } else { "failed" };
        self.bar.set_message(format!("{} {}", report.source, status));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
