use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;

use super::builder::ConfigBuilder;
use super::types::OutputFormat;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(api_key) = env_string("SEMANTIC_SCHOLAR_API_KEY")? {
        let api_key = Some(api_key).filter(|key| !key.trim().is_empty());
        builder = builder.with_search(|search| search.semantic_scholar_api_key = api_key);
    }

    if let Some(max_papers) = env_usize("LITREVIEW_MAX_PAPERS")? {
        builder = builder.with_search(|search| search.max_papers = max_papers);
    }

    if let Some(enabled) = env_bool("LITREVIEW_ENABLE_PARALLEL")? {
        builder = builder.with_workflow(|workflow| workflow.enable_parallel = enabled);
    }

    if let Some(enabled) = env_bool("LITREVIEW_ENABLE_VALIDATION")? {
        builder = builder.with_workflow(|workflow| workflow.enable_validation = enabled);
    }

    if let Some(dir) = env_string("LITREVIEW_OUTPUT_DIR")? {
        builder = builder.with_output(|output| output.dir = PathBuf::from(dir));
    }

    if let Some(raw) = env_string("LITREVIEW_OUTPUT_FORMATS")? {
        let formats = OutputFormat::parse_list(&raw)
            .with_context(|| format!("Failed to parse LITREVIEW_OUTPUT_FORMATS value '{raw}'"))?;
        builder = builder.with_output(|output| output.formats = formats);
    }

    if let Some(level) = env_string("LITREVIEW_LOG_LEVEL")? {
        builder = builder.with_logging(|logging| logging.level = level);
    }

    Ok(builder)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_usize(key: &str) -> Result<Option<usize>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Failed to parse {key} as a positive integer"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_bool(key: &str) -> Result<Option<bool>> {
    let Some(value) = env_string(key)? else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(anyhow!("Failed to parse {key} value '{value}' as a boolean")),
    }
}
