//! Shared fixtures for the concurrency scenario tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use store_concurrency::domain::{
    BackgroundTriples, CycleCount, MutationInterval, ObservationInterval, PollInterval,
    ScenarioConfig, StoredTask, TaskDocument, TaskFilter, TaskId, TaskName,
};
use store_concurrency::infrastructure::{
    DatasetStore, InMemoryTaskStore, ReplaceOutcome, TaskStore, Upsert,
};
use store_concurrency::{Error, Result};

/// Scenario with the reference shape but millisecond pacing
pub fn fast_scenario(triples: u32, cycles: u32, poll_ms: u64) -> ScenarioConfig {
    ScenarioConfig::new(
        BackgroundTriples::try_new(triples).expect("triples is valid"),
        CycleCount::try_new(cycles).expect("cycles is valid"),
        MutationInterval::try_new(Duration::from_millis(10)).expect("10ms is valid"),
        ObservationInterval::try_new(Duration::from_millis(3)).expect("3ms is valid"),
        PollInterval::try_new(Duration::from_millis(poll_ms)).expect("poll is valid"),
        None,
        ScenarioConfig::default().target_name,
    )
    .expect("fast scenario is valid")
}

pub fn task_name(name: &str) -> TaskName {
    TaskName::try_new(name.to_string()).expect("task name is valid")
}

/// Faults a [`FaultyStore`] can inject on top of a real in-memory store
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Every count after this many succeeds fails like a dropped connection
    CountFailsAfter(u64),
    /// Every replace reports this many modified documents
    ReportModified(u64),
}

pub struct FaultyStore {
    inner: InMemoryTaskStore,
    fault: Fault,
    counts: AtomicU64,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            fault,
            counts: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl TaskStore for FaultyStore {
    async fn find_by_name(&self, name: &TaskName) -> Result<Option<StoredTask>> {
        self.inner.find_by_name(name).await
    }

    async fn replace_by_identity(
        &self,
        id: TaskId,
        document: &TaskDocument,
        upsert: Upsert,
    ) -> Result<ReplaceOutcome> {
        let outcome = self.inner.replace_by_identity(id, document, upsert).await?;
        match self.fault {
            Fault::ReportModified(modified) => Ok(ReplaceOutcome { modified, ..outcome }),
            Fault::CountFailsAfter(_) => Ok(outcome),
        }
    }

    async fn count_where(&self, filter: TaskFilter) -> Result<u64> {
        if let Fault::CountFailsAfter(limit) = self.fault {
            if self.counts.fetch_add(1, Ordering::SeqCst) >= limit {
                return Err(Error::store("connection reset by peer"));
            }
        }
        self.inner.count_where(filter).await
    }
}

#[async_trait]
impl DatasetStore for FaultyStore {
    async fn reset(&self) -> Result<()> {
        self.counts.store(0, Ordering::SeqCst);
        self.inner.reset().await
    }

    async fn insert(&self, document: &TaskDocument) -> Result<TaskId> {
        self.inner.insert(document).await
    }
}
