use anyhow::anyhow;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchSettings,
    pub workflow: WorkflowSettings,
    pub validation: ValidationSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub max_papers: usize,
    pub per_source_limit: usize,
    pub semantic_scholar_api_key: Option<String>,
    pub isolate_source_failures: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub enable_parallel: bool,
    pub enable_validation: bool,
}

#[derive(Debug, Clone)]
pub struct ValidationSettings {
    /// Confidence at which a single claim counts as verified.
    pub fact_check_threshold: f64,
    /// Term overlap a paper needs to be listed as supporting a claim.
    pub support_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub formats: Vec<OutputFormat>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }

    /// Parses a comma separated list such as `markdown,json`.
    pub fn parse_list(raw: &str) -> anyhow::Result<Vec<OutputFormat>> {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(anyhow!("Unknown output format '{other}'")),
        }
    }
}

// File configuration types
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub search: FileSearchSettings,
    pub workflow: FileWorkflowSettings,
    pub validation: FileValidationSettings,
    pub output: FileOutputSettings,
    pub logging: FileLoggingSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileSearchSettings {
    pub max_papers: Option<usize>,
    pub per_source_limit: Option<usize>,
    pub semantic_scholar_api_key: Option<String>,
    pub isolate_source_failures: Option<bool>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileWorkflowSettings {
    pub enable_parallel: Option<bool>,
    pub enable_validation: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileValidationSettings {
    pub fact_check_threshold: Option<f64>,
    pub support_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileOutputSettings {
    pub dir: Option<PathBuf>,
    pub formats: Option<Vec<OutputFormat>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileLoggingSettings {
    pub level: Option<String>,
}
