use async_trait::async_trait;

use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{
    AnalysisReport, ExtractedPaper, Extraction, MethodologyComparison, MethodologyRow,
    TrendsAnalysis, YearCount,
};
use crate::agent::types::StageKind;

use super::Stage;

/// Methodology frequencies and publication-year trends across extracted papers.
pub struct AnalysisStage;

impl AnalysisStage {
    pub fn analyze(papers: &[ExtractedPaper]) -> AnalysisReport {
        AnalysisReport {
            methodology_comparison: compare_methodologies(papers),
            trends_analysis: analyze_trends(papers),
            total_papers_analyzed: papers.len(),
        }
    }
}

/// Occurrence counts in first-encounter order.
fn count_in_order<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item.to_string(), 1)),
        }
    }
    counts
}

fn compare_methodologies(papers: &[ExtractedPaper]) -> MethodologyComparison {
    let mut counts = count_in_order(
        papers
            .iter()
            .flat_map(|paper| paper.methodology.iter().map(String::as_str)),
    );
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    // stable: ties keep first-encounter order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let comparison_table: Vec<MethodologyRow> = counts
        .into_iter()
        .map(|(methodology, count)| MethodologyRow {
            methodology,
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();

    MethodologyComparison {
        total_methodologies: comparison_table.len(),
        most_common: comparison_table.first().map(|row| row.methodology.clone()),
        comparison_table,
    }
}

fn analyze_trends(papers: &[ExtractedPaper]) -> TrendsAnalysis {
    let counts = count_in_order(
        papers
            .iter()
            .filter_map(|paper| paper.year.as_deref())
            .filter(|year| !year.trim().is_empty()),
    );

    let mut peak: Option<&(String, usize)> = None;
    for entry in &counts {
        if peak.is_none_or(|best| entry.1 > best.1) {
            peak = Some(entry);
        }
    }
    let peak_year = peak.map(|(year, _)| year.clone());

    let mut yearly_trends: Vec<YearCount> = counts
        .iter()
        .map(|(year, count)| YearCount {
            year: year.clone(),
            paper_count: *count,
        })
        .collect();
    yearly_trends.sort_by(|a, b| {
        let key = |y: &str| y.trim().parse::<i64>().ok();
        key(&a.year)
            .cmp(&key(&b.year))
            .then_with(|| a.year.cmp(&b.year))
    });

    TrendsAnalysis {
        total_years_covered: yearly_trends.len(),
        yearly_trends,
        peak_year,
    }
}

#[async_trait]
impl Stage for AnalysisStage {
    type Output = AnalysisReport;

    fn kind(&self) -> StageKind {
        StageKind::Analysis
    }

    fn describe(&self) -> String {
        "Analyzing research methodologies and trends".to_string()
    }

    fn summarize(&self, output: &AnalysisReport) -> String {
        format!(
            "Analyzed {} papers and identified {} methodologies.",
            output.total_papers_analyzed, output.methodology_comparison.total_methodologies
        )
    }

    async fn run(&self, memory: &ResearchMemory, _log: &RunLog) -> Result<AnalysisReport, StageError> {
        let papers = memory
            .completed::<Extraction>()
            .map(|extraction| extraction.extracted_papers)
            .filter(|papers| !papers.is_empty())
            .ok_or_else(|| StageError::missing("No extracted content found to analyze."))?;

        Ok(Self::analyze(&papers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(methods: &[&str], year: Option<&str>) -> ExtractedPaper {
        ExtractedPaper {
            title: "t".to_string(),
            authors: Vec::new(),
            abstract_text: String::new(),
            methodology: methods.iter().map(|m| m.to_string()).collect(),
            year: year.map(str::to_string),
            url: None,
        }
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let papers = vec![
            paper(&["survey", "simulation"], Some("2021")),
            paper(&["simulation"], Some("2020")),
            paper(&["case study"], None),
        ];
        let report = AnalysisStage::analyze(&papers);
        let total: f64 = report
            .methodology_comparison
            .comparison_table
            .iter()
            .map(|row| row.percentage)
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(
            report.methodology_comparison.most_common.as_deref(),
            Some("simulation")
        );
        assert_eq!(report.methodology_comparison.comparison_table[0].count, 2);
    }

    #[test]
    fn methodology_ties_keep_first_encountered() {
        let papers = vec![paper(&["survey"], None), paper(&["simulation"], None)];
        let report = AnalysisStage::analyze(&papers);
        let order: Vec<&str> = report
            .methodology_comparison
            .comparison_table
            .iter()
            .map(|row| row.methodology.as_str())
            .collect();
        assert_eq!(order, vec!["survey", "simulation"]);
        assert_eq!(
            report.methodology_comparison.most_common.as_deref(),
            Some("survey")
        );
    }

    #[test]
    fn trends_are_chronological_with_first_seen_peak() {
        let papers = vec![
            paper(&[], Some("2022")),
            paper(&[], Some("2019")),
            paper(&[], Some("2019")),
            paper(&[], Some("2022")),
            paper(&[], Some("2020")),
            paper(&[], Some("")),
        ];
        let trends = AnalysisStage::analyze(&papers).trends_analysis;
        let years: Vec<&str> = trends.yearly_trends.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(years, vec!["2019", "2020", "2022"]);
        assert_eq!(trends.total_years_covered, 3);
        assert_eq!(trends.peak_year.as_deref(), Some("2022"));
    }

    #[test]
    fn empty_methodologies_leave_table_empty() {
        let report = AnalysisStage::analyze(&[paper(&[], None)]);
        assert!(report.methodology_comparison.comparison_table.is_empty());
        assert_eq!(report.methodology_comparison.most_common, None);
        assert_eq!(report.trends_analysis.peak_year, None);
        assert_eq!(report.total_papers_analyzed, 1);
    }
}
