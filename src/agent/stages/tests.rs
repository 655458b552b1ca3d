use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::agent::adapters::{CitationFormatter, ClaimVerifier, PaperSource};
use crate::agent::events::{RunLog, StageEvent};
use crate::agent::memory::ResearchMemory;
use crate::agent::outcome::{FailureKind, StageRecord, StageStatus};
use crate::agent::records::{
    AnalysisReport, CitationBatch, Critique, Extraction, Paper, Retrieval, SearchStrategy,
    Synthesis, ValidationReport, Verification,
};
use crate::agent::types::StageKind;

use super::{
    AnalysisStage, CriticStage, ExtractorStage, PipelineStage, PlannerStage, ReferenceStage,
    RetrieverStage, SynthesisStage, ValidatorStage,
};
use super::retriever::dedupe_papers;

pub(crate) fn paper(title: &str, year: &str, source: &str) -> Paper {
    Paper {
        title: Some(title.to_string()),
        authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
        abstract_text: format!("An experiment on {title}."),
        year: Some(year.to_string()),
        url: Some(format!("https://example.org/{}", title.replace(' ', "-"))),
        pdf_url: None,
        doi: None,
        source: source.to_string(),
    }
}

/// Source returning a fixed list and counting how often it was queried.
pub(crate) struct StaticSource {
    name: String,
    papers: Vec<Paper>,
    pub(crate) calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(name: &str, papers: Vec<Paper>) -> Self {
        Self {
            name: name.to_string(),
            papers,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaperSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Paper>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.papers.iter().take(max_results).cloned().collect())
    }
}

pub(crate) struct FailingSource;

#[async_trait]
impl PaperSource for FailingSource {
    fn name(&self) -> &str {
        "broken"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<Paper>> {
        Err(anyhow!("connection refused"))
    }
}

pub(crate) struct FixedVerifier(pub(crate) f64);

#[async_trait]
impl ClaimVerifier for FixedVerifier {
    async fn check_claim(&self, claim: &str, sources: &[Paper]) -> Result<Verification> {
        Ok(Verification {
            claim: claim.to_string(),
            verified: true,
            confidence: self.0,
            supporting_sources: sources.iter().filter_map(|p| p.title.clone()).take(1).collect(),
        })
    }
}

pub(crate) struct FailingVerifier;

#[async_trait]
impl ClaimVerifier for FailingVerifier {
    async fn check_claim(&self, _claim: &str, _sources: &[Paper]) -> Result<Verification> {
        Err(anyhow!("verifier offline"))
    }
}

pub(crate) struct TitleFormatter;

#[async_trait]
impl CitationFormatter for TitleFormatter {
    async fn generate_citations_batch(&self, papers: &[Paper]) -> Result<CitationBatch> {
        let apa: Vec<String> = papers
            .iter()
            .map(|p| format!("{}.", p.title.clone().unwrap_or_default()))
            .collect();
        Ok(CitationBatch {
            bibtex: apa.iter().map(|a| format!("@article{{{a}}}")).collect(),
            count: apa.len(),
            apa,
        })
    }
}

async fn seeded_memory(papers: Vec<Paper>) -> (ResearchMemory, RunLog) {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    PlannerStage::new(Some("Solar Energy".to_string()))
        .execute(&memory, &log)
        .await;
    let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new("fixture", papers));
    RetrieverStage::new(vec![source], 10)
        .execute(&memory, &log)
        .await;
    ExtractorStage.execute(&memory, &log).await;
    (memory, log)
}

#[tokio::test]
async fn planner_strategy_is_derived_from_topic() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();

    let status = PlannerStage::new(Some("Quantum Sensing".to_string()))
        .execute(&memory, &log)
        .await;

    assert_eq!(status, StageStatus::Completed);
    let strategy = memory.completed::<SearchStrategy>().unwrap();
    assert_eq!(strategy, PlannerStage::strategy_for("Quantum Sensing"));
    assert_eq!(strategy.subtopics.len(), 5);
    assert_eq!(strategy.queries[0], "Quantum Sensing research 1");
    assert_eq!(memory.topic().as_deref(), Some("Quantum Sensing"));
    assert_eq!(memory.strategy(), Some(strategy));
    assert!(matches!(
        log.events()[..],
        [
            StageEvent::StageStarted { stage: StageKind::Planner, .. },
            StageEvent::StageCompleted { stage: StageKind::Planner, .. }
        ]
    ));
}

#[tokio::test]
async fn planner_falls_back_to_stored_topic_then_default() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();

    PlannerStage::new(Some("  ".to_string()))
        .execute(&memory, &log)
        .await;
    assert_eq!(memory.topic().as_deref(), Some(super::DEFAULT_TOPIC));

    memory.store_topic("Tidal Power");
    PlannerStage::new(None).execute(&memory, &log).await;
    assert_eq!(
        memory.completed::<SearchStrategy>().unwrap().topic,
        "Tidal Power"
    );
}

#[test]
fn dedupe_keeps_first_occurrence_and_truncates() {
    let mut untitled = paper("x", "2020", "b");
    untitled.title = None;
    untitled.url = Some("https://example.org/a".to_string());
    let mut keyless = paper("y", "2020", "b");
    keyless.title = None;
    keyless.url = None;

    let papers = vec![
        paper("A", "2020", "arxiv"),
        paper("B", "2021", "arxiv"),
        paper("A", "2019", "semantic_scholar"),
        untitled.clone(),
        untitled,
        keyless,
        paper("C", "2022", "semantic_scholar"),
    ];

    let unique = dedupe_papers(papers.clone(), 10);
    let keys: Vec<&str> = unique.iter().filter_map(|p| p.dedup_key()).collect();
    assert_eq!(keys, vec!["A", "B", "https://example.org/a", "C"]);
    assert_eq!(unique[0].source, "arxiv");

    assert_eq!(dedupe_papers(papers, 2).len(), 2);
}

#[tokio::test]
async fn retriever_queries_all_sources_and_merges() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    PlannerStage::new(Some("Solar Energy".to_string()))
        .execute(&memory, &log)
        .await;

    let arxiv = Arc::new(StaticSource::new(
        "arxiv",
        vec![paper("Perovskites", "2021", "arxiv"), paper("Shared", "2020", "arxiv")],
    ));
    let scholar = Arc::new(StaticSource::new(
        "semantic_scholar",
        vec![paper("Shared", "2020", "semantic_scholar"), paper("Inverters", "2019", "semantic_scholar")],
    ));
    let sources: Vec<Arc<dyn PaperSource>> = vec![arxiv.clone(), scholar.clone()];

    RetrieverStage::new(sources, 10).execute(&memory, &log).await;

    let retrieval = memory.completed::<Retrieval>().unwrap();
    assert_eq!(retrieval.count, 3);
    assert_eq!(retrieval.papers[1].source, "arxiv");
    assert_eq!(arxiv.calls.load(Ordering::SeqCst), 1);
    assert_eq!(scholar.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retriever_fails_whole_stage_when_a_source_fails() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    let sources: Vec<Arc<dyn PaperSource>> = vec![
        Arc::new(StaticSource::new("arxiv", vec![paper("A", "2020", "arxiv")])),
        Arc::new(FailingSource),
    ];

    let status = RetrieverStage::new(sources, 10).execute(&memory, &log).await;

    match status {
        StageStatus::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Collaborator);
            assert!(failure.error.contains("broken failed: connection refused"));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(memory.completed::<Retrieval>().is_none());
    assert_eq!(log.failed_stages(), vec![StageKind::Retriever]);
}

#[tokio::test]
async fn retriever_can_isolate_failing_sources() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    let sources: Vec<Arc<dyn PaperSource>> = vec![
        Arc::new(StaticSource::new("arxiv", vec![paper("A", "2020", "arxiv")])),
        Arc::new(FailingSource),
    ];

    let status = RetrieverStage::new(sources, 10)
        .isolate_source_failures(true)
        .execute(&memory, &log)
        .await;

    assert_eq!(status, StageStatus::Completed);
    assert_eq!(memory.completed::<Retrieval>().unwrap().count, 1);
}

#[tokio::test]
async fn retriever_caps_each_source_request() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    let many: Vec<Paper> = (0..8).map(|i| paper(&format!("P{i}"), "2020", "arxiv")).collect();
    let sources: Vec<Arc<dyn PaperSource>> = vec![Arc::new(StaticSource::new("arxiv", many))];

    RetrieverStage::new(sources, 6)
        .with_per_source_limit(4)
        .execute(&memory, &log)
        .await;

    assert_eq!(memory.completed::<Retrieval>().unwrap().count, 4);
}

#[tokio::test]
async fn zero_papers_flow_through_extraction_but_stop_analysis() {
    let (memory, log) = seeded_memory(Vec::new()).await;

    assert_eq!(memory.completed::<Retrieval>().unwrap().count, 0);
    assert_eq!(memory.completed::<Extraction>().unwrap().total_papers, 0);

    let status = AnalysisStage.execute(&memory, &log).await;
    match status {
        StageStatus::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Precondition);
            assert!(failure.error.contains("No extracted content"));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(matches!(
        memory.result::<AnalysisReport>(),
        Some(StageRecord::Failed(_))
    ));

    let status = ReferenceStage::new(Arc::new(TitleFormatter))
        .execute(&memory, &log)
        .await;
    assert!(matches!(status, StageStatus::Failed(_)));

    assert_eq!(CriticStage.execute(&memory, &log).await, StageStatus::Completed);

    SynthesisStage.execute(&memory, &log).await;
    let synthesis = memory.completed::<Synthesis>().unwrap();
    assert!(synthesis.document.summary.contains("from 0 papers"));
}

#[tokio::test]
async fn critic_requires_extraction() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();
    let status = CriticStage.execute(&memory, &log).await;
    assert!(matches!(status, StageStatus::Failed(_)));
    assert!(memory.completed::<Critique>().is_none());
}

#[tokio::test]
async fn validator_scores_with_collaborator_confidence() {
    let (memory, log) = seeded_memory(vec![
        paper("Perovskites", "2021", "arxiv"),
        paper("Inverters", "2020", "arxiv"),
    ])
    .await;
    AnalysisStage.execute(&memory, &log).await;
    CriticStage.execute(&memory, &log).await;

    ValidatorStage::new(Arc::new(FixedVerifier(0.95)))
        .execute(&memory, &log)
        .await;

    let report = memory.completed::<ValidationReport>().unwrap();
    assert_eq!(report.quality_score, 0.95);
    assert_eq!(report.consistency_score, 0.9025);
    assert!(report.validation_passed);
    assert_eq!(report.factual_accuracy.total_checked, 1);
    assert_eq!(
        report.factual_accuracy.details[0].claim,
        "The most common methodology is experimental study."
    );
}

#[tokio::test]
async fn validator_threshold_is_inclusive() {
    let (memory, log) = seeded_memory(vec![paper("A", "2021", "arxiv")]).await;
    AnalysisStage.execute(&memory, &log).await;

    ValidatorStage::new(Arc::new(FixedVerifier(0.7)))
        .execute(&memory, &log)
        .await;
    assert!(memory.completed::<ValidationReport>().unwrap().validation_passed);

    ValidatorStage::new(Arc::new(FixedVerifier(0.69)))
        .execute(&memory, &log)
        .await;
    assert!(!memory.completed::<ValidationReport>().unwrap().validation_passed);
}

#[tokio::test]
async fn validator_downgrades_failed_checks() {
    let (memory, log) = seeded_memory(vec![paper("A", "2021", "arxiv")]).await;
    CriticStage.execute(&memory, &log).await;

    let status = ValidatorStage::new(Arc::new(FailingVerifier))
        .execute(&memory, &log)
        .await;

    assert_eq!(status, StageStatus::Completed);
    let report = memory.completed::<ValidationReport>().unwrap();
    assert_eq!(report.quality_score, 0.0);
    assert!(!report.validation_passed);
    let detail = &report.factual_accuracy.details[0];
    assert!(!detail.verified);
    assert!(detail.supporting_sources.is_empty());
    assert!(detail.claim.starts_with("Key findings reported by analysis"));
}

#[tokio::test]
async fn validator_requires_analysis_or_critique() {
    let (memory, log) = seeded_memory(vec![paper("A", "2021", "arxiv")]).await;
    let status = ValidatorStage::new(Arc::new(FixedVerifier(1.0)))
        .execute(&memory, &log)
        .await;
    assert!(matches!(status, StageStatus::Failed(_)));
}

#[tokio::test]
async fn synthesis_survives_empty_store() {
    let memory = ResearchMemory::new();
    let log = RunLog::new();

    let status = SynthesisStage.execute(&memory, &log).await;

    assert_eq!(status, StageStatus::Completed);
    let synthesis = memory.completed::<Synthesis>().unwrap();
    assert!(synthesis.document.summary.contains("from 0 papers"));
    assert_eq!(synthesis.document.recommendations.len(), 1);
}

#[tokio::test]
async fn stages_are_idempotent_for_identical_state() {
    let (memory, log) = seeded_memory(vec![
        paper("Perovskites", "2021", "arxiv"),
        paper("Inverters", "2020", "arxiv"),
    ])
    .await;

    AnalysisStage.execute(&memory, &log).await;
    let first = memory.completed::<AnalysisReport>();
    AnalysisStage.execute(&memory, &log).await;
    assert_eq!(memory.completed::<AnalysisReport>(), first);

    let references = ReferenceStage::new(Arc::new(TitleFormatter));
    references.execute(&memory, &log).await;
    let first = memory.completed::<CitationBatch>();
    references.execute(&memory, &log).await;
    assert_eq!(memory.completed::<CitationBatch>(), first);
    assert_eq!(first.unwrap().count, 2);
}
