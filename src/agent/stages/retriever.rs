use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::agent::adapters::PaperSource;
use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{Paper, Retrieval};
use crate::agent::types::StageKind;

use super::Stage;

/// Fans the first planned query out to every source and merges the answers.
pub struct RetrieverStage {
    sources: Vec<Arc<dyn PaperSource>>,
    max_papers: usize,
    per_source_limit: usize,
    isolate_source_failures: bool,
}

impl RetrieverStage {
    pub fn new(sources: Vec<Arc<dyn PaperSource>>, max_papers: usize) -> Self {
        Self {
            sources,
            max_papers,
            per_source_limit: max_papers,
            isolate_source_failures: false,
        }
    }

    pub fn with_per_source_limit(mut self, limit: usize) -> Self {
        self.per_source_limit = limit;
        self
    }

    /// Keep going with the sources that answered when another one fails.
    pub fn isolate_source_failures(mut self, isolate: bool) -> Self {
        self.isolate_source_failures = isolate;
        self
    }
}

#[async_trait]
impl Stage for RetrieverStage {
    type Output = Retrieval;

    fn kind(&self) -> StageKind {
        StageKind::Retriever
    }

    fn describe(&self) -> String {
        format!(
            "Retrieving papers from {} external source(s)",
            self.sources.len()
        )
    }

    fn summarize(&self, output: &Retrieval) -> String {
        format!("Retrieved {} papers.", output.count)
    }

    async fn run(&self, memory: &ResearchMemory, log: &RunLog) -> Result<Retrieval, StageError> {
        let query = memory
            .strategy()
            .and_then(|strategy| strategy.queries.into_iter().next())
            .unwrap_or_default();
        let limit = self.max_papers.min(self.per_source_limit);

        let query = query.as_str();
        let searches = self.sources.iter().map(|source| async move {
            (source.name().to_string(), source.search(query, limit).await)
        });

        let mut papers = Vec::new();
        for (name, outcome) in join_all(searches).await {
            match outcome {
                Ok(found) => papers.extend(found),
                Err(error) if self.isolate_source_failures => {
                    log.warning(format!("Source {name} failed and was skipped: {error:#}"));
                }
                Err(error) => return Err(StageError::collaborator(name, &error)),
            }
        }

        let papers = dedupe_papers(papers, self.max_papers);
        Ok(Retrieval {
            count: papers.len(),
            papers,
        })
    }
}

/// Keeps the first paper seen for each title (or URL), in order, up to `limit`.
pub fn dedupe_papers(papers: Vec<Paper>, limit: usize) -> Vec<Paper> {
    let mut seen = HashSet::new();
    papers
        .into_iter()
        .filter(|paper| match paper.dedup_key() {
            Some(key) => seen.insert(key.to_string()),
            None => false,
        })
        .take(limit)
        .collect()
}
