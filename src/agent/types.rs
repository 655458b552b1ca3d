use std::fmt;

/// Logical stages in the research pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Planner,
    Retriever,
    Extractor,
    Analysis,
    Critic,
    Validator,
    References,
    Synthesis,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::Planner,
        StageKind::Retriever,
        StageKind::Extractor,
        StageKind::Analysis,
        StageKind::Critic,
        StageKind::Validator,
        StageKind::References,
        StageKind::Synthesis,
    ];

    /// Name of the result slot this stage owns in state dumps.
    pub fn slot_name(self) -> &'static str {
        match self {
            StageKind::Planner => "ResearchPlannerAgent",
            StageKind::Retriever => "PaperRetrieverAgent",
            StageKind::Extractor => "ContentExtractorAgent",
            StageKind::Analysis => "AnalysisAgent",
            StageKind::Critic => "CriticAgent",
            StageKind::Validator => "ValidatorAgent",
            StageKind::References => "ReferenceManagerAgent",
            StageKind::Synthesis => "SynthesisAgent",
        }
    }

    pub fn role(self) -> &'static str {
        match self {
            StageKind::Planner => "Research Planning",
            StageKind::Retriever => "Paper Retrieval",
            StageKind::Extractor => "Content Extraction",
            StageKind::Analysis => "Methodology Comparison Expert",
            StageKind::Critic => "Academic Quality Assessor",
            StageKind::Validator => "Fact Validation Specialist",
            StageKind::References => "Citation Management Specialist",
            StageKind::Synthesis => "Master Academic Writer",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageKind::Planner => "planner",
            StageKind::Retriever => "retriever",
            StageKind::Extractor => "extractor",
            StageKind::Analysis => "analysis",
            StageKind::Critic => "critic",
            StageKind::Validator => "validator",
            StageKind::References => "references",
            StageKind::Synthesis => "synthesis",
        };
        write!(f, "{label}")
    }
}

/// Concurrency policy applied to the stages of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseMode {
    Sequential,
    Concurrent,
}

impl fmt::Display for PhaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseMode::Sequential => write!(f, "sequential"),
            PhaseMode::Concurrent => write!(f, "concurrent"),
        }
    }
}
