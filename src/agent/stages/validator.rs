use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::adapters::ClaimVerifier;
use crate::agent::error::StageError;
use crate::agent::events::RunLog;
use crate::agent::memory::ResearchMemory;
use crate::agent::records::{
    AnalysisReport, Critique, FactualAccuracy, Retrieval, ValidationReport, Verification,
};
use crate::agent::types::StageKind;

use super::Stage;

/// Minimum quality score for `validation_passed`.
pub const PASS_THRESHOLD: f64 = 0.7;
const CONSISTENCY_DISCOUNT: f64 = 0.95;
const MAX_CANDIDATE_SOURCES: usize = 3;
const GENERIC_CLAIM: &str =
    "Key findings reported by analysis should be factual and grounded in the source literature.";

/// Fact-checks claims made by the analysis and critique stages.
pub struct ValidatorStage {
    verifier: Arc<dyn ClaimVerifier>,
}

impl ValidatorStage {
    pub fn new(verifier: Arc<dyn ClaimVerifier>) -> Self {
        Self { verifier }
    }

    fn collect_claims(analysis: Option<&AnalysisReport>, critique: Option<&Critique>) -> Vec<String> {
        let mut claims = Vec::new();
        if let Some(method) = analysis.and_then(|a| a.methodology_comparison.most_common.as_ref()) {
            claims.push(format!("The most common methodology is {method}."));
        }
        if let Some(critique) = critique {
            claims.extend(
                critique
                    .suspicious_claims
                    .iter()
                    .filter(|claim| !claim.trim().is_empty())
                    .cloned(),
            );
        }
        if claims.is_empty() {
            claims.push(GENERIC_CLAIM.to_string());
        }
        claims
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[async_trait]
impl Stage for ValidatorStage {
    type Output = ValidationReport;

    fn kind(&self) -> StageKind {
        StageKind::Validator
    }

    fn describe(&self) -> String {
        "Validating results for accuracy and consistency".to_string()
    }

    fn summarize(&self, output: &ValidationReport) -> String {
        format!(
            "Validation complete. Final Quality Score: {:.2}",
            output.quality_score
        )
    }

    async fn run(&self, memory: &ResearchMemory, log: &RunLog) -> Result<ValidationReport, StageError> {
        let analysis = memory.completed::<AnalysisReport>();
        let critique = memory.completed::<Critique>();
        if analysis.is_none() && critique.is_none() {
            return Err(StageError::missing(
                "No analysis or critique results to validate.",
            ));
        }

        let claims = Self::collect_claims(analysis.as_ref(), critique.as_ref());
        let candidates: Vec<_> = memory
            .completed::<Retrieval>()
            .map(|retrieval| retrieval.papers)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_CANDIDATE_SOURCES)
            .collect();

        let mut details = Vec::with_capacity(claims.len());
        for claim in claims {
            match self.verifier.check_claim(&claim, &candidates).await {
                Ok(verification) => details.push(verification),
                Err(error) => {
                    log.warning(format!("Fact check failed for claim '{claim}': {error:#}"));
                    details.push(Verification::unverified(claim));
                }
            }
        }

        let quality_score = if details.is_empty() {
            0.0
        } else {
            let total: f64 = details
                .iter()
                .map(|v| v.confidence.clamp(0.0, 1.0))
                .sum();
            total / details.len() as f64
        };

        Ok(ValidationReport {
            quality_score: round4(quality_score),
            consistency_score: round4(quality_score * CONSISTENCY_DISCOUNT),
            validation_passed: quality_score >= PASS_THRESHOLD,
            factual_accuracy: FactualAccuracy {
                verification_count: details.iter().filter(|v| v.verified).count(),
                total_checked: details.len(),
                details,
            },
        })
    }
}
