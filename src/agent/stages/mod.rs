use async_trait::async_trait;

use super::error::StageError;
use super::events::RunLog;
use super::memory::{ResearchMemory, StageOutput};
use super::outcome::{StageFailure, StageRecord, StageStatus};
use super::types::StageKind;

mod analysis;
mod critic;
mod extractor;
mod planner;
mod references;
mod retriever;
mod synthesis;
mod validator;

pub use analysis::AnalysisStage;
pub use critic::CriticStage;
pub use extractor::ExtractorStage;
pub use planner::{DEFAULT_TOPIC, PlannerStage};
pub use references::ReferenceStage;
pub use retriever::RetrieverStage;
pub use synthesis::SynthesisStage;
pub use validator::ValidatorStage;

#[cfg(test)]
pub(crate) use synthesis::SynthesisInputs;

/// A unit of domain work producing one typed payload.
#[async_trait]
pub trait Stage: Send + Sync {
    type Output: StageOutput;

    fn kind(&self) -> StageKind;

    /// Task line for the start event.
    fn describe(&self) -> String;

    /// Output line for the completion event.
    fn summarize(&self, output: &Self::Output) -> String;

    async fn run(&self, memory: &ResearchMemory, log: &RunLog) -> Result<Self::Output, StageError>;
}

/// Object-safe view of a stage used by the scheduler.
///
/// Never fails: errors inside the stage are logged, persisted as a failed
/// record in the stage's own slot and reported through [`StageStatus`].
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage_kind(&self) -> StageKind;

    async fn execute(&self, memory: &ResearchMemory, log: &RunLog) -> StageStatus;
}

#[async_trait]
impl<S> PipelineStage for S
where
    S: Stage,
{
    fn stage_kind(&self) -> StageKind {
        self.kind()
    }

    async fn execute(&self, memory: &ResearchMemory, log: &RunLog) -> StageStatus {
        let kind = self.kind();
        log.stage_started(kind, self.describe());

        match self.run(memory, log).await {
            Ok(output) => {
                let summary = self.summarize(&output);
                memory.store_result(StageRecord::Completed(output));
                log.stage_completed(kind, summary);
                StageStatus::Completed
            }
            Err(error) => {
                let failure = StageFailure::from(&error);
                log.stage_failed(kind, &failure.error);
                memory.store_result::<S::Output>(StageRecord::Failed(failure.clone()));
                StageStatus::Failed(failure)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests;
