use anyhow::Result;

use super::types::{
    Config, LoggingSettings, OutputSettings, SearchSettings, ValidationSettings, WorkflowSettings,
};

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    pub(super) search: SearchSettings,
    pub(super) workflow: WorkflowSettings,
    pub(super) validation: ValidationSettings,
    pub(super) output: OutputSettings,
    pub(super) logging: LoggingSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut SearchSettings),
    {
        update(&mut self.search);
        self
    }

    pub fn with_workflow<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut WorkflowSettings),
    {
        update(&mut self.workflow);
        self
    }

    pub fn with_validation<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ValidationSettings),
    {
        update(&mut self.validation);
        self
    }

    pub fn with_output<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut OutputSettings),
    {
        update(&mut self.output);
        self
    }

    pub fn with_logging<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut LoggingSettings),
    {
        update(&mut self.logging);
        self
    }

    pub fn build(self) -> Result<Config> {
        let config = Config {
            search: self.search,
            workflow: self.workflow,
            validation: self.validation,
            output: self.output,
            logging: self.logging,
        };
        config.validate()?;
        Ok(config)
    }
}
