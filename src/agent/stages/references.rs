use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::adapters::CitationFormatter;
use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{CitationBatch, Retrieval};
use crate::agent::types::StageKind;

use super::Stage;

/// Produces BibTeX and APA citations for every retrieved paper.
pub struct ReferenceStage {
    formatter: Arc<dyn CitationFormatter>,
}

impl ReferenceStage {
    pub fn new(formatter: Arc<dyn CitationFormatter>) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl Stage for ReferenceStage {
    type Output = CitationBatch;

    fn kind(&self) -> StageKind {
        StageKind::References
    }

    fn describe(&self) -> String {
        "Generating references and citations".to_string()
    }

    fn summarize(&self, output: &CitationBatch) -> String {
        format!(
            "Generated {} citations in BibTeX and APA formats.",
            output.count
        )
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<CitationBatch, StageError> {
        let papers = memory
            .completed::<Retrieval>()
            .map(|retrieval| retrieval.papers)
            .filter(|papers| !papers.is_empty())
            .ok_or_else(|| {
                StageError::missing("No retrieved papers found to generate references for.")
            })?;

        self.formatter
            .generate_citations_batch(&papers)
            .await
            .map_err(|error| StageError::collaborator("citation formatter", &error))
    }
}
