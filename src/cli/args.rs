use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::OutputFormat;

use super::commands;

pub const DEFAULT_CLI_TOPIC: &str = "Artificial Intelligence in Healthcare";
pub const DEFAULT_CLI_MAX_PAPERS: usize = 10;

/// Entry point for the `litreview` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "litreview",
    about = "Automated multi-stage literature review",
    version,
    long_about = None
)]
pub struct Cli {
    /// Research topic to review
    #[arg(default_value = DEFAULT_CLI_TOPIC)]
    pub topic: String,

    /// Maximum number of papers to retrieve and analyze
    #[arg(long = "max-papers", default_value_t = DEFAULT_CLI_MAX_PAPERS)]
    pub max_papers: usize,

    /// Override the output directory
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Output format (json, markdown, html); repeat for several
    #[arg(long = "format", value_name = "FORMAT")]
    pub formats: Vec<OutputFormat>,

    /// Run the analysis phase one stage at a time
    #[arg(long)]
    pub sequential: bool,

    /// Skip the validation phase
    #[arg(long = "skip-validation")]
    pub skip_validation: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        commands::run(self).await
    }
}
