//! Experiment configuration, loaded from TOML.
//!
//! ```toml
//! name = "bank"
//! replications = 5
//! length = 480.0
//! warm_up = 60.0
//! calendar = "leftist"
//!
//! [demo]
//! arrival_mean = 4.0
//! service_mean = 3.0
//! servers = 1
//! seed = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::CalendarKind;
use crate::replication::ReplicationSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_replications")]
    pub replications: u32,
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default)]
    pub warm_up: f64,
    #[serde(default)]
    pub calendar: CalendarKind,
    #[serde(default)]
    pub continue_on_failure: bool,
    #[serde(default)]
    pub max_events: Option<u64>,
    /// Record and print the execution trace.
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            replications: default_replications(),
            length: default_length(),
            warm_up: 0.0,
            calendar: CalendarKind::default(),
            continue_on_failure: false,
            max_events: None,
            trace: false,
            demo: DemoConfig::default(),
        }
    }
}

/// Parameters of the built-in single-server queue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default = "default_arrival_mean")]
    pub arrival_mean: f64,
    #[serde(default = "default_service_mean")]
    pub service_mean: f64,
    #[serde(default = "default_servers")]
    pub servers: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            arrival_mean: default_arrival_mean(),
            service_mean: default_service_mean(),
            servers: default_servers(),
            seed: default_seed(),
        }
    }
}

fn default_name() -> String {
    "experiment".to_string()
}
fn default_replications() -> u32 {
    1
}
fn default_length() -> f64 {
    100.0
}
fn default_arrival_mean() -> f64 {
    4.0
}
fn default_service_mean() -> f64 {
    3.0
}
fn default_servers() -> u32 {
    1
}
fn default_seed() -> u64 {
    42
}

impl ExperimentConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ExperimentConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match Self::from_toml_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to load config {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replications == 0 {
            return Err(ConfigError::Invalid("replications must be > 0".into()));
        }
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "length must be a positive number, got {}",
                self.length
            )));
        }
        if !(self.warm_up.is_finite() && self.warm_up >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "warm_up must be non-negative, got {}",
                self.warm_up
            )));
        }
        if self.warm_up >= self.length {
            return Err(ConfigError::Invalid(format!(
                "warm_up ({}) must be shorter than length ({})",
                self.warm_up, self.length
            )));
        }
        if self.demo.arrival_mean <= 0.0 || self.demo.service_mean <= 0.0 {
            return Err(ConfigError::Invalid("demo means must be > 0".into()));
        }
        if self.demo.servers == 0 {
            return Err(ConfigError::Invalid("demo servers must be > 0".into()));
        }
        Ok(())
    }

    pub fn settings(&self) -> ReplicationSettings {
        ReplicationSettings {
            replications: self.replications,
            length: self.length,
            warm_up: self.warm_up,
            continue_on_failure: self.continue_on_failure,
            max_events: self.max_events,
        }
    }
}
