use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use partnerscraper::adapters::{AdapterOptions, SourceId};
use partnerscraper::cli::{Cli, Commands};
use partnerscraper::config::{AppConfig, ConfigError, CONFIG_PATH};
use partnerscraper::export::{print_run_summary, write_run_report, OutputFormat};
use partnerscraper::logger::{init_logging, RunProgress, VerbosityLevel};
use partnerscraper::pipeline::{parse_file, run_sources};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_PATH));

    if cli.init {
        let path = AppConfig::create_default_config(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Created default configuration at {}", path.display());
        return Ok(());
    }

    init_logging(VerbosityLevel::from_verbose_count(cli.verbose), cli.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Sources) | None => {
            print_sources();
            Ok(())
        }
        Some(Commands::Parse {
            source,
            input,
            format,
            output,
        }) => {
            let options = adapter_options_for(&config_path, source)?;
            let format = format
                .or_else(|| output.as_deref().and_then(OutputFormat::from_path))
                .unwrap_or(OutputFormat::Csv);
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.{}", source, format.extension())));

            let report = parse_file(source, &options, &input, &output, format)?;
            print_run_summary(&[report]);
            Ok(())
        }
        Some(Commands::Run {
            sources,
            format,
            output_dir,
            report,
        }) => {
            let config = AppConfig::load_from_path(&config_path).with_context(|| {
                format!(
                    "Failed to load {} (create one with `partnerscraper --init`)",
                    config_path.display()
                )
            })?;

            let selected = if sources.is_empty() {
                config.enabled_sources()
            } else {
                sources
            };
            if selected.is_empty() {
                warn!("No sources enabled in {}", config_path.display());
                return Ok(());
            }

            let output_dir = output_dir.unwrap_or_else(|| config.output.directory.clone());
            info!("Running {} source(s) into {}", selected.len(), output_dir.display());

            let progress = RunProgress::new(selected.len() as u64);
            let reports = run_sources(&config, &selected, format, &output_dir, &progress).await?;
            progress.finish();

            print_run_summary(&reports);
            if let Some(report_path) = report {
                write_run_report(&reports, &report_path)?;
            }
            Ok(())
        }
    }
}

/// Adapter knobs from the config file when one exists; built-in defaults otherwise.
fn adapter_options_for(config_path: &Path, source: SourceId) -> Result<AdapterOptions> {
    match AppConfig::load_from_path(config_path) {
        Ok(config) => Ok(config
            .source(source)
            .map(|cfg| cfg.adapter_options())
            .unwrap_or_default()),
        Err(ConfigError::FileNotFound(_)) => Ok(AdapterOptions::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", config_path.display())),
    }
}

fn print_sources() {
    println!("{:<14} {:<26} columns", "source", "shape");
    for source in SourceId::ALL {
        println!(
            "{:<14} {:<26} {}",
            source.as_str(),
            source.shape().to_string(),
            source.schema().join(", ")
        );
    }
}
