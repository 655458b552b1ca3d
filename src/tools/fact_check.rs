use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::{ClaimVerifier, Paper, Verification};
use crate::config::ValidationSettings;

const STOPWORDS: &[&str] = &[
    "about", "all", "and", "are", "been", "but", "for", "from", "has", "have", "into", "its",
    "more", "most", "not", "of", "than", "that", "the", "their", "these", "this", "those", "was",
    "were", "which", "with",
];

/// Scores a claim by how many of its content words appear in a candidate
/// paper's title and abstract. The best-matching paper sets the confidence.
#[derive(Debug, Clone, Copy)]
pub struct TermOverlapVerifier {
    fact_check_threshold: f64,
    support_threshold: f64,
}

impl TermOverlapVerifier {
    pub fn new(fact_check_threshold: f64, support_threshold: f64) -> Self {
        Self {
            fact_check_threshold,
            support_threshold,
        }
    }

    pub fn from_settings(settings: &ValidationSettings) -> Self {
        Self::new(settings.fact_check_threshold, settings.support_threshold)
    }

    pub fn verify(&self, claim: &str, sources: &[Paper]) -> Verification {
        let terms = significant_terms(claim);
        if terms.is_empty() || sources.is_empty() {
            return Verification::unverified(claim);
        }

        let mut confidence: f64 = 0.0;
        let mut supporting_sources = Vec::new();
        for paper in sources {
            let overlap = overlap(&terms, paper);
            confidence = confidence.max(overlap);
            if overlap > 0.0 && overlap >= self.support_threshold {
                supporting_sources.push(
                    paper
                        .title
                        .clone()
                        .unwrap_or_else(|| "Untitled".to_string()),
                );
            }
        }

        Verification {
            claim: claim.to_string(),
            verified: confidence >= self.fact_check_threshold,
            confidence,
            supporting_sources,
        }
    }
}

#[async_trait]
impl ClaimVerifier for TermOverlapVerifier {
    async fn check_claim(&self, claim: &str, sources: &[Paper]) -> Result<Verification> {
        Ok(self.verify(claim, sources))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
}

fn significant_terms(claim: &str) -> HashSet<String> {
    tokens(claim)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

fn overlap(terms: &HashSet<String>, paper: &Paper) -> f64 {
    let mut haystack: HashSet<String> = tokens(&paper.abstract_text).collect();
    if let Some(title) = &paper.title {
        haystack.extend(tokens(title));
    }
    let hits = terms.iter().filter(|term| haystack.contains(*term)).count();
    hits as f64 / terms.len() as f64
}
