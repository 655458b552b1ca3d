use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::*;

use crate::agent::{Collaborators, ResearchWorkflow, StageEvent, WorkflowOptions, WorkflowRun};
use crate::config::{Config, ConfigBuilder};
use crate::logging;
use crate::output::OutputGenerator;
use crate::sources;
use crate::tools::{BibliographyFormatter, TermOverlapVerifier};

use super::args::Cli;

const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(10);
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "quota"];

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = apply_flags(Config::load_builder()?, &cli).build()?;
    let _logging = logging::init(&config.logging, &config.output.dir, cli.verbose);

    let workflow = build_workflow(&config)?;

    println!(
        "Running research workflow for topic: {}",
        cli.topic.bold()
    );
    match run_with_retry(&workflow, &cli.topic, RATE_LIMIT_PAUSE).await {
        Ok(run) => {
            print_summary(&run);
            Ok(())
        }
        Err(err) => {
            tracing::error!("Main workflow failed: {err:#}");
            eprintln!("{}", "❌ Workflow failed".bold().red());
            Err(err)
        }
    }
}

/// Command-line flags take precedence over file and environment settings.
fn apply_flags(builder: ConfigBuilder, cli: &Cli) -> ConfigBuilder {
    let builder = builder
        .with_search(|search| search.max_papers = cli.max_papers)
        .with_workflow(|workflow| {
            if cli.sequential {
                workflow.enable_parallel = false;
            }
            if cli.skip_validation {
                workflow.enable_validation = false;
            }
        });

    builder.with_output(|output| {
        if let Some(dir) = &cli.output_dir {
            output.dir = dir.clone();
        }
        if !cli.formats.is_empty() {
            output.formats = cli.formats.clone();
        }
    })
}

pub(crate) fn build_workflow(config: &Config) -> Result<ResearchWorkflow> {
    let collaborators = Collaborators {
        sources: sources::default_sources(&config.search)?,
        citations: Arc::new(BibliographyFormatter::new()),
        verifier: Arc::new(TermOverlapVerifier::from_settings(&config.validation)),
        writer: Arc::new(OutputGenerator::from_settings(&config.output)),
    };
    Ok(ResearchWorkflow::new(
        collaborators,
        WorkflowOptions::from(config),
    ))
}

/// Runs the workflow, retrying once after `pause` when it failed on a rate limit.
async fn run_with_retry(
    workflow: &ResearchWorkflow,
    topic: &str,
    pause: Duration,
) -> Result<WorkflowRun> {
    match workflow.execute(topic).await {
        Err(err) if is_rate_limited(&err) => {
            println!(
                "{}",
                format!(
                    "Rate limit hit. Waiting {} seconds before retry...",
                    pause.as_secs()
                )
                .yellow()
            );
            tracing::warn!("retrying after rate limit: {err:#}");
            tokio::time::sleep(pause).await;
            workflow.execute(topic).await
        }
        other => other,
    }
}

fn is_rate_limited(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        let text = cause.to_string().to_lowercase();
        RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

fn skipped_phases(events: &[StageEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            StageEvent::PhaseSkipped { phase, .. } => Some(phase.as_str()),
            _ => None,
        })
        .collect()
}

fn print_summary(run: &WorkflowRun) {
    let summary = &run.summary;
    println!("\n{}", "Workflow Results:".bold());
    println!("Status: {}", summary.status.to_string().green());
    println!("Execution Time: {:.2} seconds", summary.execution_time_secs);
    println!("Papers Analyzed: {}", summary.papers_analyzed);
    println!("Quality Score: {}", summary.quality_label());

    let skipped = skipped_phases(&run.events);
    if !skipped.is_empty() {
        println!("Skipped Phases: {}", skipped.join(", ").dimmed());
    }

    let failures = run.snapshot.failures();
    if !failures.is_empty() {
        println!("\n{}", "Degraded Stages:".bold().yellow());
        for (stage, failure) in failures {
            println!("- {}: {}", stage.to_string().yellow(), failure.error);
        }
    }

    println!("\n{}", "Output Files:".bold());
    if summary.output_files.is_empty() {
        println!("{}", "(none)".dimmed());
    }
    for file in &summary.output_files {
        println!("- {}", file.display().to_string().cyan());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use clap::Parser;

    use super::*;
    use crate::agent::stages::tests::{FixedVerifier, StaticSource, TitleFormatter, paper};
    use crate::agent::{PaperSource, ReportPackage, ReportWriter, RunLog};
    use crate::config::OutputFormat;

    /// Fails the first `failures` calls with `message`, then succeeds.
    struct FlakyWriter {
        failures: usize,
        message: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReportWriter for FlakyWriter {
        async fn write_reports(
            &self,
            _package: &ReportPackage,
            _log: &RunLog,
        ) -> Result<Vec<PathBuf>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(anyhow!(self.message))
            } else {
                Ok(vec![PathBuf::from("output/review.md")])
            }
        }
    }

    fn workflow(writer: Arc<FlakyWriter>) -> ResearchWorkflow {
        let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new(
            "arxiv",
            vec![paper("Perovskite Cells", "2022", "arxiv")],
        ));
        ResearchWorkflow::new(
            Collaborators {
                sources: vec![source],
                citations: Arc::new(TitleFormatter),
                verifier: Arc::new(FixedVerifier(0.9)),
                writer,
            },
            WorkflowOptions::from(&Config::builder().build().unwrap()),
        )
    }

    #[test]
    fn flags_override_loaded_settings() {
        let cli = Cli::parse_from([
            "litreview",
            "Solar Energy",
            "--max-papers",
            "7",
            "--output-dir",
            "/tmp/reviews",
            "--format",
            "html",
            "--sequential",
            "--skip-validation",
        ]);
        let config = apply_flags(ConfigBuilder::new(), &cli).build().unwrap();

        assert_eq!(config.search.max_papers, 7);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/reviews"));
        assert_eq!(config.output.formats, vec![OutputFormat::Html]);
        assert!(!config.workflow.enable_parallel);
        assert!(!config.workflow.enable_validation);
    }

    #[test]
    fn absent_flags_keep_loaded_settings() {
        let cli = Cli::parse_from(["litreview"]);
        let config = apply_flags(ConfigBuilder::new(), &cli).build().unwrap();

        assert_eq!(config.search.max_papers, 10);
        assert_eq!(config.output.formats.len(), 3);
        assert!(config.workflow.enable_parallel);
        assert!(config.workflow.enable_validation);
    }

    #[test]
    fn rate_limit_detection_searches_error_chain() {
        let err = anyhow!("HTTP 429 Too Many Requests").context("Failed to generate output files");
        assert!(is_rate_limited(&err));
        assert!(is_rate_limited(&anyhow!("Daily QUOTA exceeded")));
        assert!(!is_rate_limited(&anyhow!("connection refused")));
    }

    #[tokio::test]
    async fn skipped_phases_are_read_from_run_events() {
        let writer = Arc::new(FlakyWriter {
            failures: 0,
            message: "",
            calls: AtomicUsize::new(0),
        });
        let config = apply_flags(
            ConfigBuilder::new(),
            &Cli::parse_from(["litreview", "--skip-validation"]),
        )
        .build()
        .unwrap();
        let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new("arxiv", Vec::new()));
        let workflow = ResearchWorkflow::new(
            Collaborators {
                sources: vec![source],
                citations: Arc::new(TitleFormatter),
                verifier: Arc::new(FixedVerifier(0.9)),
                writer,
            },
            WorkflowOptions::from(&config),
        );

        let run = workflow.execute("Solar Energy").await.unwrap();
        assert_eq!(skipped_phases(&run.events), vec!["validation"]);
        assert!(
            run.snapshot
                .failures()
                .iter()
                .any(|(stage, _)| stage.to_string() == "analysis")
        );
    }

    #[tokio::test]
    async fn retries_once_after_rate_limit() {
        let writer = Arc::new(FlakyWriter {
            failures: 1,
            message: "429 rate limited",
            calls: AtomicUsize::new(0),
        });
        let run = run_with_retry(&workflow(writer.clone()), "Solar Energy", Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(run.summary.papers_analyzed, 1);
    }

    #[tokio::test]
    async fn second_rate_limit_is_returned() {
        let writer = Arc::new(FlakyWriter {
            failures: 2,
            message: "quota exhausted",
            calls: AtomicUsize::new(0),
        });
        let err = run_with_retry(&workflow(writer.clone()), "Solar Energy", Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
        assert!(format!("{err:#}").contains("quota exhausted"));
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let writer = Arc::new(FlakyWriter {
            failures: 1,
            message: "disk full",
            calls: AtomicUsize::new(0),
        });
        let result = run_with_retry(&workflow(writer.clone()), "Solar Energy", Duration::ZERO).await;

        assert!(result.is_err());
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
    }
}
