//! Report files written at the end of a run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agent::{ReportPackage, ReportWriter, RunLog};
use crate::config::{OutputFormat, OutputSettings};

mod render;

use render::{render_html, render_json, render_markdown};

/// Writes one `review_<timestamp>.<ext>` file per configured format.
#[derive(Debug, Clone)]
pub struct OutputGenerator {
    dir: PathBuf,
    formats: Vec<OutputFormat>,
}

impl OutputGenerator {
    pub fn new(dir: impl Into<PathBuf>, formats: Vec<OutputFormat>) -> Self {
        Self {
            dir: dir.into(),
            formats,
        }
    }

    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(settings.dir.clone(), settings.formats.clone())
    }

    pub fn file_name(package: &ReportPackage, format: OutputFormat) -> String {
        format!(
            "review_{}.{}",
            package.generated_at.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    async fn write_one(&self, package: &ReportPackage, format: OutputFormat) -> Result<PathBuf> {
        let content = match format {
            OutputFormat::Json => render_json(package)?,
            OutputFormat::Markdown => render_markdown(package),
            OutputFormat::Html => render_html(package),
        };
        let path = self.dir.join(Self::file_name(package, format));
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[async_trait]
impl ReportWriter for OutputGenerator {
    async fn write_reports(&self, package: &ReportPackage, log: &RunLog) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Unable to create output directory {}", self.dir.display()))?;

        let mut files = Vec::with_capacity(self.formats.len());
        for &format in &self.formats {
            match self.write_one(package, format).await {
                Ok(path) => {
                    log.info(format!("Generated {format} output: {}", path.display()));
                    files.push(path);
                }
                Err(err) => log.error(format!("Failed to generate '{format}' output: {err:#}")),
            }
        }
        Ok(files)
    }
}
