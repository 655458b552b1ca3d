use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;

use crate::agent::{Paper, PaperSource};

pub const SEMANTIC_SCHOLAR_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const SOURCE_NAME: &str = "semantic_scholar";
const SEARCH_FIELDS: &str = "title,abstract,year,authors,url,externalIds";
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Semantic Scholar Graph API client.
///
/// Rate limits honour an integer `Retry-After` header (capped at one minute),
/// other failures back off exponentially. Exhausted retries yield an empty list.
pub struct SemanticScholarSource {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: u32,
    backoff_base: Duration,
    max_wait: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<ScholarPaper>>,
}

#[derive(Debug, Deserialize)]
struct ScholarPaper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i64>,
    #[serde(default)]
    authors: Option<Vec<ScholarAuthor>>,
    url: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ScholarAuthor {
    name: Option<String>,
}

enum Attempt {
    Papers(Vec<Paper>),
    RateLimited(Option<Duration>),
}

impl SemanticScholarSource {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: SEMANTIC_SCHOLAR_API_BASE.to_string(),
            api_key,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[cfg(test)]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    #[cfg(test)]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }

    fn retry_wait(&self, retry_after: Option<Duration>, attempt: u32) -> Duration {
        retry_after
            .unwrap_or_else(|| self.backoff(attempt))
            .min(self.max_wait)
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Attempt> {
        let url = format!("{}/paper/search", self.base_url);
        let limit = limit.to_string();
        let mut request = self.http.get(&url).query(&[
            ("query", query),
            ("limit", limit.as_str()),
            ("fields", SEARCH_FIELDS),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .context("Semantic Scholar request failed")?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Ok(Attempt::RateLimited(retry_after))
            }
            status if status.is_success() => {
                let body: SearchResponse = response
                    .json()
                    .await
                    .context("Failed to parse Semantic Scholar response JSON")?;
                let papers = body
                    .data
                    .unwrap_or_default()
                    .into_iter()
                    .map(ScholarPaper::into_paper)
                    .collect();
                Ok(Attempt::Papers(papers))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(anyhow!("Semantic Scholar returned status {status}: {text}"))
            }
        }
    }
}

impl ScholarPaper {
    fn into_paper(self) -> Paper {
        let doi = self
            .external_ids
            .as_ref()
            .and_then(|ids| ids.get("DOI"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Paper {
            title: self.title,
            authors: self
                .authors
                .unwrap_or_default()
                .into_iter()
                .filter_map(|author| author.name)
                .collect(),
            abstract_text: self.abstract_text.unwrap_or_default(),
            year: self.year.map(|year| year.to_string()),
            url: self.url.filter(|url| !url.is_empty()),
            pdf_url: None,
            doi,
            source: SOURCE_NAME.to_string(),
        }
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let limit = max_results.min(MAX_PAGE_SIZE);

        for attempt in 1..=self.max_attempts {
            let wait = match self.attempt(query, limit).await {
                Ok(Attempt::Papers(papers)) => return Ok(papers),
                Ok(Attempt::RateLimited(retry_after)) => {
                    let wait = self.retry_wait(retry_after, attempt);
                    tracing::debug!(
                        "Semantic Scholar 429 received; attempt {attempt}/{}, waiting {:.1}s",
                        self.max_attempts,
                        wait.as_secs_f64()
                    );
                    wait
                }
                Err(err) => {
                    tracing::debug!("Semantic Scholar request failed (attempt {attempt}): {err:#}");
                    self.retry_wait(None, attempt)
                }
            };
            if attempt < self.max_attempts {
                tokio::time::sleep(wait).await;
            }
        }

        tracing::debug!("Semantic Scholar: max retry attempts reached; returning empty list");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn source(server: &MockServer, api_key: Option<&str>) -> SemanticScholarSource {
        SemanticScholarSource::new(Client::new(), api_key.map(str::to_string))
            .with_base_url(server.url("/graph/v1"))
            .with_backoff_base(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn search_maps_records() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/graph/v1/paper/search")
                    .query_param("query", "solar energy")
                    .query_param("limit", "10")
                    .query_param("fields", SEARCH_FIELDS)
                    .header("x-api-key", "s2-key");
                then.status(200).json_body(json!({
                    "total": 2,
                    "data": [
                        {
                            "paperId": "abc",
                            "title": "Grid Storage",
                            "abstract": "A survey of storage.",
                            "year": 2021,
                            "authors": [{ "authorId": "1", "name": "Ada Lovelace" }],
                            "url": "https://www.semanticscholar.org/paper/abc",
                            "externalIds": { "DOI": "10.1000/xyz", "CorpusId": 42 }
                        },
                        {
                            "paperId": "def",
                            "title": null,
                            "abstract": null,
                            "year": null,
                            "authors": [],
                            "url": "https://www.semanticscholar.org/paper/def",
                            "externalIds": null
                        }
                    ]
                }));
            })
            .await;

        let papers = source(&server, Some("s2-key"))
            .search("solar energy", 10)
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title.as_deref(), Some("Grid Storage"));
        assert_eq!(papers[0].authors, vec!["Ada Lovelace"]);
        assert_eq!(papers[0].year.as_deref(), Some("2021"));
        assert_eq!(papers[0].doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(papers[0].source, "semantic_scholar");
        assert_eq!(papers[1].title, None);
        assert_eq!(papers[1].abstract_text, "");
        assert_eq!(papers[1].year, None);
        assert_eq!(papers[1].doi, None);
    }

    #[tokio::test]
    async fn limit_is_capped_at_page_size() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/graph/v1/paper/search")
                    .query_param("limit", "100");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let papers = source(&server, None).search("x", 500).await.unwrap();
        assert!(papers.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limits_are_retried_then_abandoned() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/graph/v1/paper/search");
                then.status(429).header("Retry-After", "0");
            })
            .await;

        let papers = source(&server, None).search("solar", 5).await.unwrap();
        assert!(papers.is_empty());
        mock.assert_hits_async(4).await;
    }

    #[test]
    fn retry_wait_is_capped() {
        let source = SemanticScholarSource::new(Client::new(), None);
        assert_eq!(
            source.retry_wait(Some(Duration::from_secs(86_400)), 1),
            DEFAULT_MAX_WAIT
        );
        assert_eq!(
            source.retry_wait(Some(Duration::from_secs(5)), 1),
            Duration::from_secs(5)
        );
        assert_eq!(source.retry_wait(None, 1), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn huge_retry_after_does_not_stall_search() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/graph/v1/paper/search");
                then.status(429).header("Retry-After", "86400");
            })
            .await;

        let src = source(&server, None).with_max_wait(Duration::from_millis(5));
        let search = src.search("solar", 5);
        let papers = tokio::time::timeout(Duration::from_secs(10), search)
            .await
            .expect("search should not honour a day-long Retry-After")
            .unwrap();
        assert!(papers.is_empty());
        mock.assert_hits_async(4).await;
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/graph/v1/paper/search");
                then.status(500).body("boom");
            })
            .await;

        let papers = source(&server, None).search("solar", 5).await.unwrap();
        assert!(papers.is_empty());
        mock.assert_hits_async(4).await;
    }
}
