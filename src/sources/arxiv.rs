use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;

use crate::agent::{Paper, PaperSource};

pub const ARXIV_API_BASE: &str = "http://export.arxiv.org/api/query";
const SOURCE_NAME: &str = "arxiv";

/// arXiv export API client. Failures degrade to an empty result list.
pub struct ArxivSource {
    http: Client,
    base_url: String,
}

impl ArxivSource {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, ARXIV_API_BASE)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "{}?search_query={}&start=0&max_results={}",
            self.base_url,
            urlencoding::encode(&format!("all:{query}")),
            max_results,
        )
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let url = self.search_url(query, max_results);
        tracing::debug!("arXiv search URL: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("arXiv request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("arXiv returned status {status}"));
        }

        let body = response
            .text()
            .await
            .context("Failed to read arXiv response")?;

        Ok(parse_feed(&body))
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        match self.fetch(query, max_results).await {
            Ok(papers) => Ok(papers),
            Err(err) => {
                tracing::debug!("arXiv search failed: {err:#}");
                Ok(Vec::new())
            }
        }
    }
}

fn parse_feed(xml: &str) -> Vec<Paper> {
    extract_entries(xml)
        .into_iter()
        .map(parse_entry)
        .collect()
}

/// Every `<entry>...</entry>` block, in document order.
fn extract_entries(xml: &str) -> Vec<&str> {
    const START: &str = "<entry>";
    const END: &str = "</entry>";

    let mut entries = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = xml[search_from..].find(START) {
        let start = search_from + pos;
        let Some(len) = xml[start..].find(END) else {
            break;
        };
        let end = start + len + END.len();
        entries.push(&xml[start..end]);
        search_from = end;
    }
    entries
}

fn parse_entry(entry: &str) -> Paper {
    let title = extract_tag_text(entry, "title")
        .map(|t| normalize_whitespace(&t))
        .filter(|t| !t.is_empty());

    let mut authors = Vec::new();
    let mut author_search = 0;
    while let Some(pos) = entry[author_search..].find("<author>") {
        let author_start = author_search + pos;
        let Some(len) = entry[author_start..].find("</author>") else {
            break;
        };
        let author_end = author_start + len + "</author>".len();
        if let Some(name) = extract_tag_text(&entry[author_start..author_end], "name") {
            authors.push(name);
        }
        author_search = author_end;
    }

    let abstract_text = normalize_whitespace(&extract_tag_text(entry, "summary").unwrap_or_default());
    let year = extract_tag_text(entry, "published")
        .map(|published| published.chars().take(4).collect::<String>())
        .filter(|year| !year.is_empty());
    let url = extract_tag_text(entry, "id").filter(|id| !id.is_empty());

    let mut pdf_url = None;
    let mut link_search = 0;
    while let Some(pos) = entry[link_search..].find("<link") {
        let link_start = link_search + pos;
        let Some(len) = entry[link_start..].find('>') else {
            break;
        };
        let link_end = link_start + len + 1;
        let tag = &entry[link_start..link_end];
        let is_pdf = extract_attribute(tag, "title").as_deref() == Some("pdf")
            || extract_attribute(tag, "type").as_deref() == Some("application/pdf");
        if is_pdf {
            pdf_url = extract_attribute(tag, "href");
        }
        link_search = link_end;
    }

    Paper {
        title,
        authors,
        abstract_text,
        year,
        url,
        pdf_url,
        doi: None,
        source: SOURCE_NAME.to_string(),
    }
}

/// Text of the first `<tag ...>text</tag>`, trimmed.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut search_from = 0;
    loop {
        let start = search_from + xml[search_from..].find(&open)?;
        let after_name = start + open.len();
        // skip longer tag names sharing the prefix, e.g. <id> vs <idx>
        match xml[after_name..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') => {}
            _ => {
                search_from = after_name;
                continue;
            }
        }
        let content_start = after_name + xml[after_name..].find('>')? + 1;
        let content_end = content_start + xml[content_start..].find(&close)?;
        return Some(decode_entities(xml[content_start..content_end].trim()));
    }
}

fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let needle = format!(" {attr}=\"");
    let start = tag.find(&needle)? + needle.len();
    let end = start + tag[start..].find('"')?;
    Some(decode_entities(&tag[start..end]))
}

/// Resolves the predefined XML entities and numeric character references.
/// Unknown or malformed references are kept verbatim.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let resolved = tail
            .find(';')
            .and_then(|semi| resolve_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match resolved {
            Some((ch, semi)) => {
                decoded.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                decoded.push('&');
                rest = &tail[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::memory::ResearchMemory;
    use crate::agent::stages::tests::StaticSource;
    use crate::agent::stages::{RetrieverStage, Stage};
    use crate::agent::RunLog;
    use httpmock::prelude::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:solar</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <published>2021-01-04T10:00:00Z</published>
    <title>Perovskite   Solar
      Cells at Scale</title>
    <summary>  We run an experiment on
      tandem cells.  </summary>
    <author><name>Jane Doe</name></author>
    <author><name>John Roe</name></author>
    <link href="http://arxiv.org/abs/2101.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2101.00001v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2102.00002v2</id>
    <title>Untimed Note</title>
    <summary></summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries() {
        let papers = parse_feed(FEED);
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title.as_deref(), Some("Perovskite Solar Cells at Scale"));
        assert_eq!(first.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(first.abstract_text, "We run an experiment on tandem cells.");
        assert_eq!(first.year.as_deref(), Some("2021"));
        assert_eq!(first.url.as_deref(), Some("http://arxiv.org/abs/2101.00001v1"));
        assert_eq!(
            first.pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/2101.00001v1")
        );
        assert_eq!(first.source, "arxiv");

        let second = &papers[1];
        assert!(second.authors.is_empty());
        assert_eq!(second.year, None);
        assert_eq!(second.pdf_url, None);
        assert_eq!(second.abstract_text, "");
    }

    #[test]
    fn entities_are_decoded_in_text_and_attributes() {
        let feed = r#"<feed><entry>
    <id>http://arxiv.org/abs/2103.00003v1</id>
    <title>Solar &amp; Wind &lt;Grids&gt;</title>
    <summary>PV &amp; storage at &#8220;scale&#x201D;</summary>
    <author><name>Ana O&apos;Neil</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/2103.00003v1?a=1&amp;b=2" type="application/pdf"/>
  </entry></feed>"#;

        let papers = parse_feed(feed);
        let paper = &papers[0];
        assert_eq!(paper.title.as_deref(), Some("Solar & Wind <Grids>"));
        assert_eq!(paper.abstract_text, "PV & storage at \u{201c}scale\u{201d}");
        assert_eq!(paper.authors, vec!["Ana O'Neil"]);
        assert_eq!(
            paper.pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/2103.00003v1?a=1&b=2")
        );
    }

    #[tokio::test]
    async fn decoded_titles_dedupe_against_other_sources() {
        let feed = "<entry><title>Solar &amp; Wind &lt;Grids&gt;</title><summary></summary></entry>";
        let scholar_copy = Paper {
            title: Some("Solar & Wind <Grids>".to_string()),
            source: "semantic_scholar".to_string(),
            ..Paper::default()
        };
        let sources: Vec<Arc<dyn PaperSource>> = vec![
            Arc::new(StaticSource::new("arxiv", parse_feed(feed))),
            Arc::new(StaticSource::new("semantic_scholar", vec![scholar_copy])),
        ];

        let retrieval = RetrieverStage::new(sources, 10)
            .run(&ResearchMemory::new(), &RunLog::new())
            .await
            .unwrap();
        assert_eq!(retrieval.count, 1);
        assert_eq!(retrieval.papers[0].source, "arxiv");
    }

    #[test]
    fn unknown_entities_are_kept() {
        assert_eq!(decode_entities("R&D &nbsp; &#zz; &amp"), "R&D &nbsp; &#zz; &amp");
        assert_eq!(decode_entities("&lt;&#65;&gt;"), "<A>");
    }

    #[test]
    fn empty_feed_has_no_papers() {
        assert!(parse_feed("<feed></feed>").is_empty());
    }

    #[tokio::test]
    async fn search_queries_export_api() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/query")
                    .query_param("search_query", "all:solar energy")
                    .query_param("start", "0")
                    .query_param("max_results", "5");
                then.status(200)
                    .header("content-type", "application/atom+xml")
                    .body(FEED);
            })
            .await;

        let source = ArxivSource::with_base_url(Client::new(), server.url("/api/query"));
        let papers = source.search("solar energy", 5).await.unwrap();

        assert_eq!(papers.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_degrade_to_empty_list() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/query");
                then.status(503);
            })
            .await;

        let source = ArxivSource::with_base_url(Client::new(), server.url("/api/query"));
        let papers = source.search("solar energy", 5).await.unwrap();

        assert!(papers.is_empty());
        mock.assert_async().await;
    }
}
