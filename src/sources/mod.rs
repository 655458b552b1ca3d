//! Paper search providers backing the retrieval stage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::agent::PaperSource;
use crate::config::SearchSettings;

mod arxiv;
mod semantic_scholar;

pub use arxiv::ArxivSource;
pub use semantic_scholar::SemanticScholarSource;

pub fn http_client(search: &SearchSettings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(search.request_timeout_secs))
        .user_agent(search.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")
}

/// arXiv first, then Semantic Scholar, sharing one HTTP client.
pub fn default_sources(search: &SearchSettings) -> Result<Vec<Arc<dyn PaperSource>>> {
    let http = http_client(search)?;
    Ok(vec![
        Arc::new(ArxivSource::new(http.clone())),
        Arc::new(SemanticScholarSource::new(
            http,
            search.semantic_scholar_api_key.clone(),
        )),
    ])
}
