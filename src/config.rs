use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::domain::scenario::{
    BackgroundTriples, CycleCount, MutationInterval, ObservationInterval, PollInterval,
    RunTimeout, ScenarioConfig, DEFAULT_TARGET_NAME,
};
use crate::domain::task::TaskName;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub harness: HarnessSettings,
    pub store: StoreSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarnessSettings {
    pub background_triples: u32,
    pub cycles: u32,
    pub mutation_interval_ms: u64,
    pub observation_interval_ms: u64,
    pub poll_interval_ms: u64,
    /// Zero disables the overall wall-clock limit
    pub run_timeout_secs: u64,
    pub target_name: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub max_connections: u32,
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::defaults()?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("STORE_CONCURRENCY").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load defaults overlaid by one explicit file
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("harness.background_triples", 100)?
            .set_default("harness.cycles", 1000)?
            .set_default("harness.mutation_interval_ms", 500)?
            .set_default("harness.observation_interval_ms", 250)?
            .set_default("harness.poll_interval_ms", 1000)?
            .set_default("harness.run_timeout_secs", 0)?
            .set_default("harness.target_name", DEFAULT_TARGET_NAME)?
            .set_default("store.backend", "postgres")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.username", "postgres")?
            .set_default("database.password", "password")?
            .set_default("database.database_name", "store_concurrency")?
            .set_default("database.max_connections", 10)?
            .set_default("database.collection", "task")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "full")
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }
}

impl HarnessSettings {
    /// Validate raw settings into the typed scenario the actors consume
    pub fn scenario(&self) -> Result<ScenarioConfig> {
        let run_timeout = match self.run_timeout_secs {
            0 => None,
            secs => Some(
                RunTimeout::try_new(Duration::from_secs(secs))
                    .map_err(|e| Error::invalid_input("harness.run_timeout_secs", e.to_string()))?,
            ),
        };

        ScenarioConfig::new(
            BackgroundTriples::try_new(self.background_triples)
                .map_err(|e| Error::invalid_input("harness.background_triples", e.to_string()))?,
            CycleCount::try_new(self.cycles)
                .map_err(|e| Error::invalid_input("harness.cycles", e.to_string()))?,
            MutationInterval::try_new(Duration::from_millis(self.mutation_interval_ms))
                .map_err(|e| Error::invalid_input("harness.mutation_interval_ms", e.to_string()))?,
            ObservationInterval::try_new(Duration::from_millis(self.observation_interval_ms))
                .map_err(|e| {
                    Error::invalid_input("harness.observation_interval_ms", e.to_string())
                })?,
            PollInterval::try_new(Duration::from_millis(self.poll_interval_ms))
                .map_err(|e| Error::invalid_input("harness.poll_interval_ms", e.to_string()))?,
            run_timeout,
            TaskName::try_new(self.target_name.clone())
                .map_err(|e| Error::invalid_input("harness.target_name", e.to_string()))?,
        )
    }
}
