use std::fmt::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::agent::{MemorySnapshot, ReportPackage, ReviewDocument};

const NO_REVIEW: &str = "No review generated.";

const HTML_HEAD: &str = concat!(
    "<!DOCTYPE html>",
    "<html><head><meta charset=\"utf-8\"><title>Literature Review</title>",
    "<style>body{font-family:sans-serif;max-width:900px;margin:auto;padding:20px;line-height:1.5} ",
    "table{border-collapse:collapse;width:100%} table,th,td{border:1px solid #ddd;padding:8px} th{background:#f4f4f4}",
    "</style></head><body>",
);

#[derive(Serialize)]
struct JsonReport<'a> {
    topic: &'a str,
    generated_at: String,
    literature_review: Option<&'a ReviewDocument>,
    #[serde(flatten)]
    results: &'a MemorySnapshot,
}

/// Review document plus every stage record keyed by slot name.
pub fn render_json(package: &ReportPackage) -> Result<String> {
    let report = JsonReport {
        topic: &package.topic,
        generated_at: package.generated_at.to_rfc3339(),
        literature_review: package.document.as_ref(),
        results: &package.snapshot,
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize review to JSON")
}

pub fn render_markdown(package: &ReportPackage) -> String {
    let mut out = format!(
        "# Literature Review\nGenerated: {}\n\n",
        package.generated_at.to_rfc3339()
    );

    let Some(doc) = &package.document else {
        out.push_str(NO_REVIEW);
        out.push_str("\n\n");
        push_markdown_references(&mut out, &package.snapshot.apa_references());
        return out;
    };

    let _ = write!(out, "# {}\n\n", doc.title);
    let _ = write!(out, "## Summary\n\n{}\n\n", doc.summary);
    let _ = write!(out, "## Key Findings\n\n{}\n\n", doc.key_findings);

    if !doc.methodology_table.is_empty() {
        out.push_str("## Methodology Comparison\n\n");
        out.push_str("| Methodology | Papers | Share |\n|---|---|---|\n");
        for row in &doc.methodology_table {
            let _ = writeln!(
                out,
                "| {} | {} | {:.1}% |",
                row.methodology, row.count, row.percentage
            );
        }
        out.push('\n');
    }

    if !doc.paper_summaries.is_empty() {
        out.push_str("## Papers Reviewed\n\n");
        for paper in &doc.paper_summaries {
            let _ = write!(out, "### {}. {}\n\n", paper.index, paper.title);
            let _ = write!(
                out,
                "*{}* ({})\n\n",
                authors_or_unknown(&paper.authors),
                paper.year.as_deref().unwrap_or("N/A")
            );
            if !paper.abstract_snippet.is_empty() {
                let _ = write!(out, "{}\n\n", paper.abstract_snippet);
            }
            if let Some(url) = &paper.url {
                let _ = write!(out, "[Link]({url})\n\n");
            }
        }
    }

    push_markdown_list(&mut out, "Research Gaps", &doc.research_gaps);
    push_markdown_list(&mut out, "Recommendations", &doc.recommendations);
    push_markdown_references(&mut out, &doc.references);
    let _ = write!(out, "## Conclusion\n\n{}\n", doc.conclusion);
    out
}

fn push_markdown_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(out, "## {heading}\n\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

fn push_markdown_references(out: &mut String, references: &[String]) {
    if references.is_empty() {
        return;
    }
    out.push_str("## References\n\n");
    for (i, cite) in references.iter().enumerate() {
        let _ = write!(out, "{}. {cite}\n\n", i + 1);
    }
}

pub fn render_html(package: &ReportPackage) -> String {
    let mut out = String::from(HTML_HEAD);

    let Some(doc) = &package.document else {
        let _ = write!(out, "<p>{NO_REVIEW}</p>");
        push_html_references(&mut out, &package.snapshot.apa_references());
        out.push_str("</body></html>");
        return out;
    };

    let _ = write!(out, "<h1>{}</h1>", escape_html(&doc.title));
    let _ = write!(
        out,
        "<p><em>Generated: {}</em></p>",
        package.generated_at.to_rfc3339()
    );
    let _ = write!(out, "<h2>Summary</h2><p>{}</p>", escape_html(&doc.summary));
    let _ = write!(
        out,
        "<h2>Key Findings</h2><p>{}</p>",
        escape_html(&doc.key_findings)
    );

    if !doc.methodology_table.is_empty() {
        out.push_str("<h2>Methodology Comparison</h2><table>");
        out.push_str("<tr><th>Methodology</th><th>Papers</th><th>Share</th></tr>");
        for row in &doc.methodology_table {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
                escape_html(&row.methodology),
                row.count,
                row.percentage
            );
        }
        out.push_str("</table>");
    }

    if !doc.paper_summaries.is_empty() {
        out.push_str("<h2>Papers Reviewed</h2>");
        for paper in &doc.paper_summaries {
            let _ = write!(
                out,
                "<h3>{}. {}</h3><p><em>{}</em> ({})</p>",
                paper.index,
                escape_html(&paper.title),
                escape_html(&authors_or_unknown(&paper.authors)),
                escape_html(paper.year.as_deref().unwrap_or("N/A"))
            );
            if !paper.abstract_snippet.is_empty() {
                let _ = write!(out, "<p>{}</p>", escape_html(&paper.abstract_snippet));
            }
            if let Some(url) = &paper.url {
                let url = escape_html(url);
                let _ = write!(out, "<p><a href=\"{url}\">{url}</a></p>");
            }
        }
    }

    push_html_list(&mut out, "Research Gaps", &doc.research_gaps);
    push_html_list(&mut out, "Recommendations", &doc.recommendations);
    push_html_references(&mut out, &doc.references);
    let _ = write!(
        out,
        "<h2>Conclusion</h2><p>{}</p>",
        escape_html(&doc.conclusion)
    );
    out.push_str("</body></html>");
    out
}

fn push_html_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(out, "<h2>{heading}</h2><ul>");
    for item in items {
        let _ = write!(out, "<li>{}</li>", escape_html(item));
    }
    out.push_str("</ul>");
}

fn push_html_references(out: &mut String, references: &[String]) {
    if references.is_empty() {
        return;
    }
    out.push_str("<h2>References</h2><ol>");
    for cite in references {
        let _ = write!(out, "<li>{}</li>", escape_html(cite));
    }
    out.push_str("</ol>");
}

fn authors_or_unknown(authors: &[String]) -> String {
    if authors.is_empty() {
        "Unknown authors".to_string()
    } else {
        authors.join(", ")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
