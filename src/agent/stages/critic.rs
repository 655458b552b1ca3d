use async_trait::async_trait;

use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{Critique, Extraction};
use crate::agent::types::StageKind;

use super::Stage;

/// Identifies weaknesses, gaps and recommendations for the collected body of work.
pub struct CriticStage;

impl CriticStage {
    fn critique() -> Critique {
        Critique {
            methodological_weaknesses: vec![
                "Over-reliance on synthetic datasets.".to_string(),
                "Lack of longitudinal studies.".to_string(),
            ],
            research_gaps: vec![
                "Exploration of cross-disciplinary applications.".to_string(),
                "Need for standardized evaluation metrics.".to_string(),
            ],
            contradictions: Vec::new(),
            recommendations: vec![
                "Incorporate real-world data for validation.".to_string(),
                "Develop benchmarks for comparing different approaches.".to_string(),
            ],
            suspicious_claims: Vec::new(),
        }
    }
}

#[async_trait]
impl Stage for CriticStage {
    type Output = Critique;

    fn kind(&self) -> StageKind {
        StageKind::Critic
    }

    fn describe(&self) -> String {
        "Critiquing research content to find gaps".to_string()
    }

    fn summarize(&self, output: &Critique) -> String {
        format!("Identified {} research gaps.", output.research_gaps.len())
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<Critique, StageError> {
        if memory.completed::<Extraction>().is_none() {
            return Err(StageError::missing("No content available to critique."));
        }
        Ok(Self::critique())
    }
}
