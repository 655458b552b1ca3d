use async_trait::async_trait;

use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{ExtractedPaper, Extraction, Paper, Retrieval};
use crate::agent::types::StageKind;

use super::Stage;

const UNSPECIFIED_METHOD: &str = "unspecified";

// keyword found in the abstract -> methodology label
const METHOD_KEYWORDS: &[(&str, &str)] = &[
    ("systematic review", "systematic review"),
    ("meta-analysis", "meta-analysis"),
    ("survey", "survey"),
    ("case study", "case study"),
    ("simulation", "simulation"),
    ("experiment", "experimental study"),
    ("deep learning", "deep learning"),
    ("neural network", "deep learning"),
    ("machine learning", "machine learning"),
    ("interview", "qualitative study"),
    ("qualitative", "qualitative study"),
    ("benchmark", "benchmarking"),
];

/// Normalizes retrieved papers into records the analysis stages consume.
pub struct ExtractorStage;

impl ExtractorStage {
    pub fn extract(paper: &Paper) -> ExtractedPaper {
        ExtractedPaper {
            title: paper.title.clone().unwrap_or_default(),
            authors: paper.authors.clone(),
            abstract_text: paper.abstract_text.clone(),
            methodology: infer_methodology(&paper.abstract_text),
            year: paper.year.clone(),
            url: paper.preferred_url().map(str::to_string),
        }
    }
}

fn infer_methodology(abstract_text: &str) -> Vec<String> {
    let lowered = abstract_text.to_lowercase();
    let mut methods: Vec<String> = Vec::new();
    for (keyword, label) in METHOD_KEYWORDS {
        if lowered.contains(keyword) && !methods.iter().any(|m| m == label) {
            methods.push((*label).to_string());
        }
    }
    if methods.is_empty() {
        methods.push(UNSPECIFIED_METHOD.to_string());
    }
    methods
}

#[async_trait]
impl Stage for ExtractorStage {
    type Output = Extraction;

    fn kind(&self) -> StageKind {
        StageKind::Extractor
    }

    fn describe(&self) -> String {
        "Extracting content from papers".to_string()
    }

    fn summarize(&self, output: &Extraction) -> String {
        format!("Extracted content from {} papers.", output.total_papers)
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<Extraction, StageError> {
        let papers = memory
            .completed::<Retrieval>()
            .map(|retrieval| retrieval.papers)
            .unwrap_or_default();

        let extracted_papers: Vec<ExtractedPaper> = papers.iter().map(Self::extract).collect();
        Ok(Extraction {
            total_papers: extracted_papers.len(),
            extracted_papers,
        })
    }
}
