use thiserror::Error;

use super::types::Config;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("output.formats must list at least one format")]
    NoOutputFormats,
    #[error("{name} must be between 0 and 1, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.search.max_papers == 0 {
        return Err(ConfigError::ZeroLimit("search.max_papers"));
    }
    if config.search.per_source_limit == 0 {
        return Err(ConfigError::ZeroLimit("search.per_source_limit"));
    }
    if config.output.formats.is_empty() {
        return Err(ConfigError::NoOutputFormats);
    }

    let thresholds = [
        (
            "validation.fact_check_threshold",
            config.validation.fact_check_threshold,
        ),
        (
            "validation.support_threshold",
            config.validation.support_threshold,
        ),
    ];
    for (name, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ThresholdOutOfRange { name, value });
        }
    }
    Ok(())
}
