use async_trait::async_trait;

use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::SearchStrategy;
use crate::agent::types::StageKind;

use super::Stage;

pub const DEFAULT_TOPIC: &str = "Unspecified Topic";
const SUBTOPIC_COUNT: usize = 5;
const QUERY_COUNT: usize = 10;

/// Turns a topic into subtopics and search queries.
pub struct PlannerStage {
    topic: Option<String>,
}

impl PlannerStage {
    pub fn new(topic: Option<String>) -> Self {
        Self {
            topic: topic.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn strategy_for(topic: &str) -> SearchStrategy {
        SearchStrategy {
            topic: topic.to_string(),
            subtopics: (1..=SUBTOPIC_COUNT)
                .map(|i| format!("{topic} subtopic {i}"))
                .collect(),
            queries: (1..=QUERY_COUNT)
                .map(|i| format!("{topic} research {i}"))
                .collect(),
        }
    }
}

#[async_trait]
impl Stage for PlannerStage {
    type Output = SearchStrategy;

    fn kind(&self) -> StageKind {
        StageKind::Planner
    }

    fn describe(&self) -> String {
        match &self.topic {
            Some(topic) => format!("Planning research for topic: {topic}"),
            None => "Planning research for the stored topic".to_string(),
        }
    }

    fn summarize(&self, output: &SearchStrategy) -> String {
        format!(
            "Research strategy created with {} subtopics and {} queries.",
            output.subtopics.len(),
            output.queries.len()
        )
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<SearchStrategy, StageError> {
        let topic = self
            .topic
            .clone()
            .or_else(|| memory.topic().filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        let strategy = Self::strategy_for(&topic);
        memory.store_topic(topic);
        memory.store_strategy(strategy.clone());
        Ok(strategy)
    }
}
