use serde::{Deserialize, Serialize};

/// A paper as returned by a search source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paper {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    pub year: Option<String>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub source: String,
}

impl Paper {
    #[cfg(test)]
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            source: source.into(),
            ..Self::default()
        }
    }

    /// Title, or URL when the title is missing. Papers without either cannot be deduplicated.
    pub fn dedup_key(&self) -> Option<&str> {
        non_blank(self.title.as_deref()).or_else(|| non_blank(self.url.as_deref()))
    }

    /// Landing page, falling back to the PDF link.
    pub fn preferred_url(&self) -> Option<&str> {
        non_blank(self.url.as_deref()).or_else(|| non_blank(self.pdf_url.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStrategy {
    pub topic: String,
    pub subtopics: Vec<String>,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub papers: Vec<Paper>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedPaper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub methodology: Vec<String>,
    pub year: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub extracted_papers: Vec<ExtractedPaper>,
    pub total_papers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodologyRow {
    pub methodology: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodologyComparison {
    pub comparison_table: Vec<MethodologyRow>,
    pub total_methodologies: usize,
    pub most_common: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub year: String,
    pub paper_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsAnalysis {
    pub yearly_trends: Vec<YearCount>,
    pub total_years_covered: usize,
    pub peak_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub methodology_comparison: MethodologyComparison,
    pub trends_analysis: TrendsAnalysis,
    pub total_papers_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Critique {
    pub methodological_weaknesses: Vec<String>,
    pub research_gaps: Vec<String>,
    pub contradictions: Vec<String>,
    pub recommendations: Vec<String>,
    /// Statements the critic wants fact-checked by the validator.
    pub suspicious_claims: Vec<String>,
}

/// Outcome of checking one claim against candidate sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub claim: String,
    pub verified: bool,
    pub confidence: f64,
    pub supporting_sources: Vec<String>,
}

impl Verification {
    pub fn unverified(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            verified: false,
            confidence: 0.0,
            supporting_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactualAccuracy {
    pub verification_count: usize,
    pub total_checked: usize,
    pub details: Vec<Verification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub quality_score: f64,
    pub factual_accuracy: FactualAccuracy,
    /// Quality score with a fixed 5% discount; not measured independently.
    pub consistency_score: f64,
    pub validation_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationBatch {
    pub bibtex: Vec<String>,
    pub apa: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperSummary {
    pub index: usize,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub abstract_snippet: String,
    pub url: Option<String>,
}

/// The synthesized literature review, section by section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDocument {
    pub title: String,
    pub summary: String,
    pub key_findings: String,
    pub methodology_table: Vec<MethodologyRow>,
    pub paper_summaries: Vec<PaperSummary>,
    pub research_gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub references: Vec<String>,
    pub conclusion: String,
}

impl ReviewDocument {
    /// All section text joined with newlines, used for the size metric.
    pub fn plain_text(&self) -> String {
        let mut parts = vec![
            self.title.clone(),
            self.summary.clone(),
            self.key_findings.clone(),
        ];
        for row in &self.methodology_table {
            parts.push(format!(
                "{} {} {:.1}%",
                row.methodology, row.count, row.percentage
            ));
        }
        for paper in &self.paper_summaries {
            parts.push(paper.title.clone());
            parts.push(paper.authors.join(", "));
            parts.push(paper.abstract_snippet.clone());
        }
        parts.extend(self.research_gaps.iter().cloned());
        parts.extend(self.recommendations.iter().cloned());
        parts.extend(self.references.iter().cloned());
        parts.push(self.conclusion.clone());
        parts.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub document: ReviewDocument,
    pub word_count: usize,
}
