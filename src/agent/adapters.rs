use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::events::RunLog;
use super::memory::MemorySnapshot;
use super::records::{CitationBatch, Paper, ReviewDocument, Verification};

/// A searchable source of academic papers.
///
/// Implementations retry transient failures themselves; an `Err` means the
/// source is unusable for this run.
#[async_trait]
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>>;
}

#[async_trait]
pub trait CitationFormatter: Send + Sync {
    async fn generate_citations_batch(&self, papers: &[Paper]) -> Result<CitationBatch>;
}

#[async_trait]
pub trait ClaimVerifier: Send + Sync {
    async fn check_claim(&self, claim: &str, sources: &[Paper]) -> Result<Verification>;
}

/// Everything the report writer needs once synthesis has finished.
#[derive(Debug, Clone)]
pub struct ReportPackage {
    pub topic: String,
    pub document: Option<ReviewDocument>,
    pub snapshot: MemorySnapshot,
    pub generated_at: DateTime<Local>,
}

/// Renders the final state into files.
///
/// A single format's failure is logged and skipped; an `Err` aborts the run.
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write_reports(&self, package: &ReportPackage, log: &RunLog) -> Result<Vec<PathBuf>>;
}
