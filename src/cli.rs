use crate::adapters::SourceId;
use crate::export::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "partnerscraper")]
#[command(about = "Extracts partner and business records from web sources into fixed-schema CSV/JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/partnerscraper.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Configuration file path (defaults to ./config/partnerscraper.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write log output to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, parse and write every enabled source (or only those given)
    Run {
        /// Source to run; repeat for several. Defaults to all enabled sources
        #[arg(short, long = "source", value_enum)]
        sources: Vec<SourceId>,

        /// Output format for every source (default: from each output file's extension)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output directory (overrides [output].directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Also write the per-source run report as JSON to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Parse a saved page or API response without touching the network
    Parse {
        /// Source whose adapter should read the file
        #[arg(short, long, value_enum)]
        source: SourceId,

        /// Saved HTML or JSON document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output format (default: from the output file extension, else csv)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (default: <source>.<format> in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List known sources with their shapes and output columns
    Sources,
}
