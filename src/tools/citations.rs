use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::{CitationBatch, CitationFormatter, Paper};

const NO_TITLE: &str = "No Title";
const NO_YEAR: &str = "N/A";
const NO_YEAR_KEY: &str = "nd";
const UNKNOWN_AUTHOR: &str = "unknown";

/// BibTeX and APA strings for a batch of papers.
///
/// Keys that collide inside one batch get a letter suffix in batch order:
/// `doe2021deep`, `doe2021deepb`, `doe2021deepc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BibliographyFormatter;

impl BibliographyFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn bibtex(paper: &Paper, key: &str) -> String {
        format!(
            "@article{{{key},\n  author = {{{}}},\n  title = {{{}}},\n  year = {{{}}}\n}}",
            paper.authors.join(" and "),
            escape_bibtex(title(paper)),
            year(paper).unwrap_or(NO_YEAR),
        )
    }

    pub fn apa(paper: &Paper) -> String {
        format!(
            "{} ({}). {}.",
            paper.authors.join(", "),
            year(paper).unwrap_or(NO_YEAR),
            title(paper),
        )
    }

    pub fn batch(papers: &[Paper]) -> CitationBatch {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let bibtex = papers
            .iter()
            .map(|paper| {
                let base = cite_key(paper);
                let count = seen.entry(base.clone()).or_insert(0);
                let key = match *count {
                    0 => base,
                    n => format!("{base}{}", collision_suffix(n)),
                };
                *count += 1;
                Self::bibtex(paper, &key)
            })
            .collect();
        let apa = papers.iter().map(Self::apa).collect();

        CitationBatch {
            bibtex,
            apa,
            count: papers.len(),
        }
    }
}

#[async_trait]
impl CitationFormatter for BibliographyFormatter {
    async fn generate_citations_batch(&self, papers: &[Paper]) -> Result<CitationBatch> {
        Ok(Self::batch(papers))
    }
}

/// `{first-author surname}{year}{first title word}`, lower-cased ASCII letters
/// (digits kept for the year).
pub fn cite_key(paper: &Paper) -> String {
    let author = paper
        .authors
        .first()
        .and_then(|name| name.split_whitespace().last())
        .map(letters_only)
        .filter(|surname| !surname.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let year = year(paper)
        .map(|year| {
            year.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|year| !year.is_empty())
        .unwrap_or_else(|| NO_YEAR_KEY.to_string());

    let word = paper
        .title
        .as_deref()
        .and_then(|title| title.split_whitespace().next())
        .map(letters_only)
        .unwrap_or_default();

    format!("{author}{year}{word}")
}

fn letters_only(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// 1 -> "b", 25 -> "z", then numeric
fn collision_suffix(n: usize) -> String {
    match u8::try_from(n) {
        Ok(n) if n < 26 => char::from(b'a' + n).to_string(),
        _ => (n + 1).to_string(),
    }
}

fn title(paper: &Paper) -> &str {
    paper
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(NO_TITLE)
}

fn year(paper: &Paper) -> Option<&str> {
    paper.year.as_deref().filter(|y| !y.trim().is_empty())
}

fn escape_bibtex(s: &str) -> String {
    s.replace('&', "\\&")
        .replace('%', "\\%")
        .replace('$', "\\$")
        .replace('#', "\\#")
        .replace('_', "\\_")
}
