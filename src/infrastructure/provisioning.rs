//! Seeding of the dataset a run verifies against
//!
//! Runs once before the actors start and is never called by them.

use tracing::{info, instrument};

use crate::domain::scenario::ScenarioConfig;
use crate::domain::task::{TaskFilter, TaskId};
use crate::error::{Error, Result};
use crate::infrastructure::store::DatasetStore;

/// What provisioning left in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedDataset {
    pub total_records: u64,
    pub target_id: TaskId,
    pub expected_undone: u64,
}

/// Reset the collection and seed N background triples plus the target task.
///
/// The seeded collection is checked against the scenario's invariant before
/// returning, so a run never starts from a dataset that is already wrong.
#[instrument(skip(store, scenario), fields(triples = %scenario.background_triples))]
pub async fn provision_dataset<S>(store: &S, scenario: &ScenarioConfig) -> Result<ProvisionedDataset>
where
    S: DatasetStore + ?Sized,
{
    store.reset().await?;

    for document in scenario.background_documents()? {
        store.insert(&document).await?;
    }
    let target_id = store.insert(&scenario.target_document()).await?;

    let expected_undone = scenario.expected_undone_count();
    let undone = store.count_where(TaskFilter::undone()).await?;
    if undone != expected_undone {
        return Err(Error::store(format!(
            "provisioned {undone} undone tasks, expected {expected_undone}"
        )));
    }

    info!(
        total_records = scenario.total_records(),
        expected_undone, "Dataset provisioned"
    );

    Ok(ProvisionedDataset {
        total_records: scenario.total_records(),
        target_id,
        expected_undone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskStatus;
    use crate::infrastructure::memory::InMemoryTaskStore;
    use crate::infrastructure::store::TaskStore;

    #[tokio::test]
    async fn provisions_default_dataset() {
        let store = InMemoryTaskStore::new();
        let scenario = ScenarioConfig::default();

        let dataset = provision_dataset(&store, &scenario).await.unwrap();

        assert_eq!(dataset.total_records, 301);
        assert_eq!(dataset.expected_undone, 201);
        assert_eq!(store.len(), 301);
        assert_eq!(
            store
                .count_where(TaskFilter::StatusIs(TaskStatus::Done))
                .await
                .unwrap(),
            100
        );
    }

    #[tokio::test]
    async fn target_is_pending_and_addressable() {
        let store = InMemoryTaskStore::new();
        let scenario = ScenarioConfig::default();

        let dataset = provision_dataset(&store, &scenario).await.unwrap();
        let target = store
            .find_by_name(&scenario.target_name)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(target.id, dataset.target_id);
        assert_eq!(target.document.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn reprovisioning_discards_previous_state() {
        let store = InMemoryTaskStore::new();
        let scenario = ScenarioConfig::default();
        provision_dataset(&store, &scenario).await.unwrap();
        store
            .overwrite_status(&scenario.target_name, TaskStatus::Done)
            .unwrap();

        let dataset = provision_dataset(&store, &scenario).await.unwrap();

        assert_eq!(
            store.count_where(TaskFilter::undone()).await.unwrap(),
            dataset.expected_undone
        );
    }
}
