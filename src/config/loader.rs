use anyhow::{Context, Result};
use dirs::home_dir;
use std::{fs, path::Path, path::PathBuf};

use super::Config;
use super::builder::ConfigBuilder;
use super::constants::CONFIG_FILE;
use super::environment::apply_env_overrides;
use super::types::FileConfig;
use super::validation::validate;

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(CONFIG_FILE);
        Ok(path)
    }

    #[cfg(test)]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Defaults, then the config file, then the environment.
    #[cfg(test)]
    pub fn load() -> Result<Self> {
        Self::load_builder()?.build()
    }

    /// Defaults, then the config file, then the environment, left open for
    /// command-line overrides.
    pub fn load_builder() -> Result<ConfigBuilder> {
        let path = Self::config_path()?;
        let mut builder = ConfigBuilder::new();

        if path.exists() {
            builder = Self::apply_file(builder, &path)?;
        }

        apply_env_overrides(builder)
    }

    pub fn validate(&self) -> Result<()> {
        validate(self)?;
        Ok(())
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let file: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        Ok(file.apply(builder))
    }
}

impl FileConfig {
    pub fn apply(self, builder: ConfigBuilder) -> ConfigBuilder {
        let FileConfig {
            search,
            workflow,
            validation,
            output,
            logging,
        } = self;

        builder
            .with_search(|settings| {
                if let Some(max_papers) = search.max_papers {
                    settings.max_papers = max_papers;
                }
                if let Some(limit) = search.per_source_limit {
                    settings.per_source_limit = limit;
                }
                if let Some(api_key) = search.semantic_scholar_api_key {
                    settings.semantic_scholar_api_key = Some(api_key);
                }
                if let Some(isolate) = search.isolate_source_failures {
                    settings.isolate_source_failures = isolate;
                }
                if let Some(timeout) = search.request_timeout_secs {
                    settings.request_timeout_secs = timeout;
                }
            })
            .with_workflow(|settings| {
                if let Some(enabled) = workflow.enable_parallel {
                    settings.enable_parallel = enabled;
                }
                if let Some(enabled) = workflow.enable_validation {
                    settings.enable_validation = enabled;
                }
            })
            .with_validation(|settings| {
                if let Some(threshold) = validation.fact_check_threshold {
                    settings.fact_check_threshold = threshold;
                }
                if let Some(threshold) = validation.support_threshold {
                    settings.support_threshold = threshold;
                }
            })
            .with_output(|settings| {
                if let Some(dir) = output.dir {
                    settings.dir = dir;
                }
                if let Some(formats) = output.formats {
                    settings.formats = formats;
                }
            })
            .with_logging(|settings| {
                if let Some(level) = logging.level {
                    settings.level = level;
                }
            })
    }
}
