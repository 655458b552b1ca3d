use async_trait::async_trait;

use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{
    AnalysisReport, CitationBatch, Critique, ExtractedPaper, Extraction, PaperSummary,
    ReviewDocument, Synthesis,
};
use crate::agent::types::StageKind;

use super::{DEFAULT_TOPIC, Stage};

const ABSTRACT_SNIPPET_CHARS: usize = 600;
const FALLBACK_METHOD: &str = "various methods";
const NOT_AVAILABLE: &str = "N/A";

/// Assembles the final review from whatever upstream stages produced.
pub struct SynthesisStage;

/// Upstream payloads the review is built from; any of them may be missing.
#[derive(Debug, Default)]
pub struct SynthesisInputs {
    pub topic: Option<String>,
    pub analysis: Option<AnalysisReport>,
    pub critique: Option<Critique>,
    pub extraction: Option<Extraction>,
    pub references: Option<CitationBatch>,
}

impl SynthesisStage {
    pub fn compose(inputs: SynthesisInputs) -> Synthesis {
        let topic = inputs
            .topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let papers = inputs
            .extraction
            .map(|extraction| extraction.extracted_papers)
            .unwrap_or_default();

        let (most_common, methodology_table, years_covered, peak_year) = match inputs.analysis {
            Some(analysis) => (
                analysis.methodology_comparison.most_common,
                analysis.methodology_comparison.comparison_table,
                Some(analysis.trends_analysis.total_years_covered),
                analysis.trends_analysis.peak_year,
            ),
            None => (None, Vec::new(), None, None),
        };

        let (research_gaps, recommendations) = match inputs.critique {
            Some(critique) => (critique.research_gaps, critique.recommendations),
            None => (Vec::new(), Vec::new()),
        };
        let research_gaps = non_empty_or(research_gaps, "Further empirical studies needed.");
        let recommendations =
            non_empty_or(recommendations, "Broaden datasets, standardize evaluation.");

        let document = ReviewDocument {
            title: format!("Systematic Literature Review: {topic}"),
            summary: format!(
                "This automated literature review synthesizes findings from {} papers on {topic}. \
                 It includes per-paper summaries, a methodology comparison, trends across years, \
                 identified research gaps, and actionable recommendations.",
                papers.len()
            ),
            key_findings: format!(
                "The analysis identified {} as the most frequently used methodology. \
                 Yearly coverage spans {} years with peak activity in {}.",
                most_common.as_deref().unwrap_or(FALLBACK_METHOD),
                years_covered.map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string()),
                peak_year.as_deref().unwrap_or(NOT_AVAILABLE),
            ),
            methodology_table,
            paper_summaries: papers.iter().enumerate().map(summarize_paper).collect(),
            research_gaps,
            recommendations,
            references: inputs.references.map(|batch| batch.apa).unwrap_or_default(),
            conclusion: format!(
                "This review provides a synthesized snapshot of the state of the art for {topic}. \
                 Use the references and per-paper summaries to dive deeper into specific works."
            ),
        };

        let word_count = document.plain_text().split_whitespace().count();
        Synthesis {
            document,
            word_count,
        }
    }
}

fn non_empty_or(items: Vec<String>, fallback: &str) -> Vec<String> {
    if items.is_empty() {
        vec![fallback.to_string()]
    } else {
        items
    }
}

fn summarize_paper((idx, paper): (usize, &ExtractedPaper)) -> PaperSummary {
    let title = if paper.title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        paper.title.clone()
    };
    PaperSummary {
        index: idx + 1,
        title,
        authors: paper.authors.clone(),
        year: paper.year.clone().filter(|y| !y.trim().is_empty()),
        abstract_snippet: snippet(paper.abstract_text.trim(), ABSTRACT_SNIPPET_CHARS),
        url: paper.url.clone(),
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[async_trait]
impl Stage for SynthesisStage {
    type Output = Synthesis;

    fn kind(&self) -> StageKind {
        StageKind::Synthesis
    }

    fn describe(&self) -> String {
        "Synthesizing final literature review".to_string()
    }

    fn summarize(&self, output: &Synthesis) -> String {
        format!(
            "Synthesized a {}-word literature review.",
            output.word_count
        )
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<Synthesis, StageError> {
        Ok(Self::compose(SynthesisInputs {
            topic: memory.topic(),
            analysis: memory.completed::<AnalysisReport>(),
            critique: memory.completed::<Critique>(),
            extraction: memory.completed::<Extraction>(),
            references: memory.completed::<CitationBatch>(),
        }))
    }
}
