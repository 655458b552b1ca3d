use std::path::PathBuf;

use super::constants::*;
use super::types::{
    LoggingSettings, OutputFormat, OutputSettings, SearchSettings, ValidationSettings,
    WorkflowSettings,
};

pub fn default_user_agent() -> String {
    format!("litreview/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_papers: DEFAULT_MAX_PAPERS,
            per_source_limit: DEFAULT_PER_SOURCE_LIMIT,
            semantic_scholar_api_key: None,
            isolate_source_failures: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            enable_parallel: true,
            enable_validation: true,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            fact_check_threshold: DEFAULT_FACT_CHECK_THRESHOLD,
            support_threshold: DEFAULT_SUPPORT_THRESHOLD,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            formats: vec![OutputFormat::Markdown, OutputFormat::Json, OutputFormat::Html],
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
