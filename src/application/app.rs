use crate::application::coordinator::Coordinator;
use crate::application::report::RunReport;
use crate::config::{Settings, StoreBackend};
use crate::domain::scenario::ScenarioConfig;
use crate::infrastructure::{
    provision_dataset, CollectionName, DatasetStore, Database, InMemoryTaskStore,
    PostgresTaskStore,
};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, instrument};

/// Main application struct that wires settings, store and coordinator together
pub struct Application {
    settings: Settings,
    scenario: ScenarioConfig,
    store: Arc<dyn DatasetStore>,
}

impl Application {
    #[instrument]
    pub async fn new() -> Result<Self> {
        let settings = Settings::new()?;
        Self::from_settings(settings).await
    }

    #[instrument(skip(settings), fields(backend = ?settings.store.backend))]
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let scenario = settings.harness.scenario()?;

        let store: Arc<dyn DatasetStore> = match settings.store.backend {
            StoreBackend::Postgres => {
                let database = Database::connect(&settings).await?;
                database.health_check().await?;
                let collection = CollectionName::try_new(settings.database.collection.clone())
                    .map_err(|e| Error::invalid_input("database.collection", e.to_string()))?;
                Arc::new(PostgresTaskStore::new(database.into_pool(), collection))
            }
            StoreBackend::Memory => Arc::new(InMemoryTaskStore::new()),
        };

        Ok(Self::with_store(settings, scenario, store))
    }

    /// Build around an already constructed store
    pub fn with_store(
        settings: Settings,
        scenario: ScenarioConfig,
        store: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            settings,
            scenario,
            store,
        }
    }

    /// Provision a fresh dataset and run one verification to a verdict
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunReport> {
        let dataset = provision_dataset(self.store.as_ref(), &self.scenario).await?;
        info!(
            records = dataset.total_records,
            expected_undone = dataset.expected_undone,
            "Starting verification run"
        );

        Coordinator::new(Arc::clone(&self.store), self.scenario.clone())
            .run()
            .await
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
