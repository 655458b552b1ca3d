use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use futures::future::join_all;
use serde_json::json;

use crate::config::Config;

use super::adapters::{
    CitationFormatter, ClaimVerifier, PaperSource, ReportPackage, ReportWriter,
};
use super::events::{RunLog, StageEvent};
use super::memory::{MemorySnapshot, ResearchMemory};
use super::outcome::{RunStatus, RunSummary};
use super::records::{Extraction, Synthesis, ValidationReport};
use super::stages::{
    AnalysisStage, CriticStage, ExtractorStage, PipelineStage, PlannerStage, ReferenceStage,
    RetrieverStage, SynthesisStage, ValidatorStage,
};
use super::types::{PhaseMode, StageKind};

/// A group of stages executed under one concurrency policy.
pub struct Phase {
    name: &'static str,
    mode: PhaseMode,
    stages: Vec<Arc<dyn PipelineStage>>,
}

impl Phase {
    pub fn new(name: &'static str, mode: PhaseMode) -> Self {
        Self {
            name,
            mode,
            stages: Vec::new(),
        }
    }

    pub fn with_stage<S>(mut self, stage: S) -> Self
    where
        S: PipelineStage + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mode(&self) -> PhaseMode {
        self.mode
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.stage_kind()).collect()
    }

    async fn run(&self, memory: &Arc<ResearchMemory>, log: &Arc<RunLog>) -> Result<()> {
        log.phase_started(self.name, self.mode);
        match self.mode {
            PhaseMode::Sequential => {
                for stage in &self.stages {
                    stage.execute(memory, log).await;
                }
            }
            PhaseMode::Concurrent => {
                let handles = self.stages.iter().map(|stage| {
                    let stage = Arc::clone(stage);
                    let memory = Arc::clone(memory);
                    let log = Arc::clone(log);
                    tokio::spawn(async move { stage.execute(&memory, &log).await })
                });
                // wait for every stage, even after one of them panics
                let joined = join_all(handles).await;
                for outcome in joined {
                    outcome.with_context(|| format!("stage aborted during {} phase", self.name))?;
                }
            }
        }
        Ok(())
    }
}

/// Ordered phases plus the phases deliberately left out of this run.
pub struct WorkflowPlan {
    phases: Vec<Phase>,
    skipped: Vec<(&'static str, &'static str)>,
}

impl WorkflowPlan {
    pub fn builder() -> WorkflowPlanBuilder {
        WorkflowPlanBuilder::new()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub async fn run(&self, memory: &Arc<ResearchMemory>, log: &Arc<RunLog>) -> Result<()> {
        for (phase, reason) in &self.skipped {
            log.phase_skipped(phase, *reason);
        }
        for phase in &self.phases {
            phase.run(memory, log).await?;
        }
        Ok(())
    }
}

pub struct WorkflowPlanBuilder {
    phases: Vec<Phase>,
    skipped: Vec<(&'static str, &'static str)>,
}

impl WorkflowPlanBuilder {
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn skip(mut self, phase: &'static str, reason: &'static str) -> Self {
        self.skipped.push((phase, reason));
        self
    }

    pub fn build(self) -> WorkflowPlan {
        WorkflowPlan {
            phases: self.phases,
            skipped: self.skipped,
        }
    }
}

impl Default for WorkflowPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// External capabilities the stages are wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub sources: Vec<Arc<dyn PaperSource>>,
    pub citations: Arc<dyn CitationFormatter>,
    pub verifier: Arc<dyn ClaimVerifier>,
    pub writer: Arc<dyn ReportWriter>,
}

/// Knobs that shape the phase graph and stage inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOptions {
    pub max_papers: usize,
    pub per_source_limit: usize,
    pub isolate_source_failures: bool,
    pub enable_parallel: bool,
    pub enable_validation: bool,
}

impl From<&Config> for WorkflowOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_papers: config.search.max_papers,
            per_source_limit: config.search.per_source_limit,
            isolate_source_failures: config.search.isolate_source_failures,
            enable_parallel: config.workflow.enable_parallel,
            enable_validation: config.workflow.enable_validation,
        }
    }
}

/// Result of one workflow run: the summary plus the state it was built from.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub summary: RunSummary,
    pub snapshot: MemorySnapshot,
    pub events: Vec<StageEvent>,
}

pub struct ResearchWorkflow {
    collaborators: Collaborators,
    options: WorkflowOptions,
}

impl ResearchWorkflow {
    pub fn new(collaborators: Collaborators, options: WorkflowOptions) -> Self {
        Self {
            collaborators,
            options,
        }
    }

    /// Phase graph for one run on `topic`.
    pub fn plan(&self, topic: &str) -> WorkflowPlan {
        let options = &self.options;
        let collaborators = &self.collaborators;

        let retrieval = Phase::new("retrieval", PhaseMode::Sequential)
            .with_stage(PlannerStage::new(Some(topic.to_string())))
            .with_stage(
                RetrieverStage::new(collaborators.sources.clone(), options.max_papers)
                    .with_per_source_limit(options.per_source_limit)
                    .isolate_source_failures(options.isolate_source_failures),
            )
            .with_stage(ExtractorStage);

        let analysis_mode = if options.enable_parallel {
            PhaseMode::Concurrent
        } else {
            PhaseMode::Sequential
        };
        let analysis = Phase::new("analysis", analysis_mode)
            .with_stage(AnalysisStage)
            .with_stage(CriticStage)
            .with_stage(ReferenceStage::new(Arc::clone(&collaborators.citations)));

        let mut builder = WorkflowPlan::builder().phase(retrieval).phase(analysis);

        builder = if options.enable_validation {
            builder.phase(
                Phase::new("validation", PhaseMode::Sequential)
                    .with_stage(ValidatorStage::new(Arc::clone(&collaborators.verifier))),
            )
        } else {
            builder.skip("validation", "validation disabled")
        };

        builder
            .phase(Phase::new("synthesis", PhaseMode::Sequential).with_stage(SynthesisStage))
            .build()
    }

    pub async fn execute(&self, topic: &str) -> Result<WorkflowRun> {
        let started = Instant::now();
        let memory = Arc::new(ResearchMemory::new());
        let log = Arc::new(RunLog::new());
        log.info(format!("WORKFLOW START: {topic}"));
        memory.store_context("max_papers", json!(self.options.max_papers));
        memory.store_context("per_source_limit", json!(self.options.per_source_limit));

        match self.drive(topic, &memory, &log).await {
            Ok(output_files) => {
                let execution_time_secs = started.elapsed().as_secs_f64();
                log.info(format!("WORKFLOW COMPLETED in {execution_time_secs:.2}s"));

                let summary = RunSummary {
                    status: RunStatus::Success,
                    execution_time_secs,
                    output_files,
                    papers_analyzed: memory
                        .completed::<Extraction>()
                        .map_or(0, |extraction| extraction.total_papers),
                    quality_score: memory
                        .completed::<ValidationReport>()
                        .map(|report| report.quality_score),
                };
                Ok(WorkflowRun {
                    summary,
                    snapshot: memory.snapshot(),
                    events: log.events(),
                })
            }
            Err(error) => {
                log.error(format!("WORKFLOW FAILED: {error:#}"));
                Err(error)
            }
        }
    }

    async fn drive(
        &self,
        topic: &str,
        memory: &Arc<ResearchMemory>,
        log: &Arc<RunLog>,
    ) -> Result<Vec<std::path::PathBuf>> {
        let plan = self.plan(topic);
        for phase in plan.phases() {
            tracing::debug!(
                phase = phase.name(),
                mode = %phase.mode(),
                stages = ?phase.stage_kinds(),
                "planned phase"
            );
        }
        plan.run(memory, log).await?;

        let package = ReportPackage {
            topic: memory.topic().unwrap_or_else(|| topic.to_string()),
            document: memory
                .completed::<Synthesis>()
                .map(|synthesis| synthesis.document),
            snapshot: memory.snapshot(),
            generated_at: Local::now(),
        };
        self.collaborators
            .writer
            .write_reports(&package, log)
            .await
            .context("Failed to generate output files")
    }
}
