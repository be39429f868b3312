//! Supervision of one verification run
//!
//! Spawns the mutator and observer side by side, polls their published
//! status at a fixed interval and turns the first failure it sees into a
//! run-ending error. Nothing is retried.

use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::application::mutator::Mutator;
use crate::application::observer::Observer;
use crate::application::report::RunReport;
use crate::application::status::{
    shutdown_channel, status_channel, ActorRole, MutatorState, ObserverState, StatusWatcher,
};
use crate::domain::scenario::ScenarioConfig;
use crate::error::{Error, Result};
use crate::infrastructure::store::TaskStore;

pub struct Coordinator<S: ?Sized> {
    store: Arc<S>,
    scenario: ScenarioConfig,
}

/// The two actor tasks of a run and which role each task id belongs to
struct Actors {
    tasks: JoinSet<()>,
    roles: HashMap<Id, ActorRole>,
}

struct Watchers {
    mutator: StatusWatcher<MutatorState>,
    observer: StatusWatcher<ObserverState>,
}

impl<S> Coordinator<S>
where
    S: TaskStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, scenario: ScenarioConfig) -> Self {
        Self { store, scenario }
    }

    /// Run both actors to a verdict.
    ///
    /// Returns the report of a clean run, or the first failure observed.
    /// Actors still running when this returns have been cancelled.
    #[instrument(
        name = "coordinator",
        skip(self),
        fields(
            cycles = %self.scenario.cycles,
            expected = self.scenario.expected_undone_count()
        )
    )]
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let (mutator_status, mutator_watcher) = status_channel(MutatorState::Running {
            cycles_completed: 0,
        });
        let (observer_status, observer_watcher) =
            status_channel(ObserverState::Consistent { observations: 0 });
        let (trigger, shutdown) = shutdown_channel();

        let mutator = Mutator::new(Arc::clone(&self.store), &self.scenario, mutator_status);
        let observer = Observer::new(
            Arc::clone(&self.store),
            &self.scenario,
            observer_status,
            shutdown,
        );

        let mut actors = Actors {
            tasks: JoinSet::new(),
            roles: HashMap::with_capacity(2),
        };
        let handle = actors.tasks.spawn(async move {
            mutator.run().await;
        });
        actors.roles.insert(handle.id(), ActorRole::Mutator);
        let handle = actors.tasks.spawn(async move {
            observer.run().await;
        });
        actors.roles.insert(handle.id(), ActorRole::Observer);

        info!("Actors started");
        let watchers = Watchers {
            mutator: mutator_watcher,
            observer: observer_watcher,
        };
        let verdict = self.supervise(&mut actors, &watchers, start).await;

        trigger.trigger();
        if verdict.is_ok() {
            // Let the observer record its clean stop before anything is aborted
            let drain = async { while actors.tasks.join_next().await.is_some() {} };
            if tokio::time::timeout(self.scenario.poll_interval.into_inner(), drain)
                .await
                .is_err()
            {
                warn!("Actors did not stop within one poll interval, aborting");
            }
        }
        actors.tasks.shutdown().await;

        match verdict {
            Ok(polls) => {
                let report = RunReport {
                    started_at,
                    elapsed: start.elapsed(),
                    expected_undone: self.scenario.expected_undone_count(),
                    cycles_completed: watchers.mutator.current().cycles_completed(),
                    observations: watchers.observer.current().successful_observations(),
                    polls,
                };
                info!(%report, "Run passed");
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, kind = %err.kind(), "Run failed");
                Err(err)
            }
        }
    }

    /// Poll until the mutator finishes, then make the final checks.
    /// Returns the number of polls made.
    async fn supervise(
        &self,
        actors: &mut Actors,
        watchers: &Watchers,
        start: Instant,
    ) -> Result<u64> {
        let poll_interval = self.scenario.poll_interval.into_inner();
        // A timeout too large to represent as an instant never expires
        let deadline = self
            .scenario
            .run_timeout
            .and_then(|timeout| start.checked_add(timeout.into_inner()));
        let mut polls = 0;

        let mutator = loop {
            tokio::time::sleep(poll_interval).await;
            polls += 1;

            reap_panics(actors)?;
            if let Some(failure) = watchers.observer.current().failure() {
                return Err(failure);
            }
            let mutator = watchers.mutator.current();
            if mutator.is_finished() {
                break mutator;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Error::RunTimedOut(start.elapsed()));
            }
        };

        if let Some(failure) = watchers.observer.current().failure() {
            return Err(failure);
        }
        if let MutatorState::Failed { error, .. } = mutator {
            return Err(Error::actor(ActorRole::Mutator, error));
        }
        Ok(polls)
    }
}

/// Surface a panicked actor, which would otherwise never publish a terminal state
fn reap_panics(actors: &mut Actors) -> Result<()> {
    while let Some(joined) = actors.tasks.try_join_next_with_id() {
        if let Err(err) = joined {
            if err.is_panic() {
                let id = err.id();
                let message = panic_message(err);
                return Err(match actors.roles.get(&id) {
                    Some(&actor) => Error::ActorPanicked { actor, message },
                    None => Error::UntrackedPanic {
                        task: id.to_string(),
                        message,
                    },
                });
            }
        }
    }
    Ok(())
}

fn panic_message(err: JoinError) -> String {
    let payload: Box<dyn Any + Send> = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scenario::{
        BackgroundTriples, CycleCount, MutationInterval, ObservationInterval, PollInterval,
        RunTimeout,
    };
    use crate::domain::task::{StoredTask, TaskDocument, TaskFilter, TaskId, TaskName, TaskStatus};
    use crate::error::ErrorKind;
    use crate::infrastructure::memory::InMemoryTaskStore;
    use crate::infrastructure::provisioning::provision_dataset;
    use crate::infrastructure::store::{DatasetStore, ReplaceOutcome, Upsert};
    use async_trait::async_trait;
    use std::time::Duration;

    fn fast_scenario(cycles: u32) -> ScenarioConfig {
        ScenarioConfig::new(
            BackgroundTriples::try_new(3).unwrap(),
            CycleCount::try_new(cycles).unwrap(),
            MutationInterval::try_new(Duration::from_millis(4)).unwrap(),
            ObservationInterval::try_new(Duration::from_millis(1)).unwrap(),
            PollInterval::try_new(Duration::from_millis(10)).unwrap(),
            None,
            ScenarioConfig::default().target_name,
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clean_run_passes() {
        let scenario = fast_scenario(5);
        let store = Arc::new(InMemoryTaskStore::new());
        provision_dataset(store.as_ref(), &scenario).await.unwrap();

        let report = Coordinator::new(store.clone(), scenario.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.cycles_completed, 5);
        assert_eq!(report.expected_undone, 7);
        assert!(report.observations > 0);
        assert!(report.polls > 0);
        assert_eq!(store.count_where(TaskFilter::undone()).await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_target_fails_the_run_as_mutator_lookup_failure() {
        let scenario = fast_scenario(5);
        let store = Arc::new(InMemoryTaskStore::new());
        provision_dataset(store.as_ref(), &scenario).await.unwrap();
        store.remove(&scenario.target_name).unwrap();
        // Keep the count intact so only the mutator fails
        store
            .insert(&TaskDocument::new(
                TaskName::try_new("stand-in".to_string()).unwrap(),
                TaskStatus::Pending,
            ))
            .await
            .unwrap();

        let err = Coordinator::new(store, scenario).run().await.unwrap_err();

        assert_eq!(err.actor_role(), Some(ActorRole::Mutator));
        assert_eq!(err.kind(), ErrorKind::LookupFailure);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_ends_a_run_that_would_take_too_long() {
        let scenario = ScenarioConfig {
            cycles: CycleCount::try_new(10_000).unwrap(),
            run_timeout: Some(RunTimeout::try_new(Duration::from_millis(50)).unwrap()),
            ..fast_scenario(1)
        };
        let store = Arc::new(InMemoryTaskStore::new());
        provision_dataset(store.as_ref(), &scenario).await.unwrap();

        let err = Coordinator::new(store, scenario).run().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unrepresentable_timeout_means_no_deadline() {
        let scenario = ScenarioConfig {
            run_timeout: Some(RunTimeout::try_new(Duration::from_secs(u64::MAX)).unwrap()),
            ..fast_scenario(2)
        };
        let store = Arc::new(InMemoryTaskStore::new());
        provision_dataset(store.as_ref(), &scenario).await.unwrap();

        let report = Coordinator::new(store, scenario).run().await.unwrap();

        assert_eq!(report.cycles_completed, 2);
    }

    #[derive(Clone, Copy)]
    enum PanicIn {
        Count,
        Replace,
    }

    /// Store that panics in one operation, standing in for a bug inside an actor
    struct PanickingStore {
        inner: InMemoryTaskStore,
        panic_in: PanicIn,
    }

    #[async_trait]
    impl TaskStore for PanickingStore {
        async fn find_by_name(&self, name: &TaskName) -> Result<Option<StoredTask>> {
            self.inner.find_by_name(name).await
        }

        async fn replace_by_identity(
            &self,
            id: TaskId,
            document: &TaskDocument,
            upsert: Upsert,
        ) -> Result<ReplaceOutcome> {
            if let PanicIn::Replace = self.panic_in {
                panic!("replace exploded");
            }
            self.inner.replace_by_identity(id, document, upsert).await
        }

        async fn count_where(&self, filter: TaskFilter) -> Result<u64> {
            if let PanicIn::Count = self.panic_in {
                panic!("count exploded");
            }
            self.inner.count_where(filter).await
        }
    }

    async fn run_panicking(panic_in: PanicIn) -> Error {
        let scenario = ScenarioConfig {
            cycles: CycleCount::try_new(1_000).unwrap(),
            ..fast_scenario(1)
        };
        let inner = InMemoryTaskStore::new();
        provision_dataset(&inner, &scenario).await.unwrap();
        let store = Arc::new(PanickingStore { inner, panic_in });

        Coordinator::new(store, scenario).run().await.unwrap_err()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_observer_is_reported() {
        match run_panicking(PanicIn::Count).await {
            Error::ActorPanicked { actor, message } => {
                assert_eq!(actor, ActorRole::Observer);
                assert_eq!(message, "count exploded");
            }
            other => panic!("expected panic report, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_mutator_is_reported() {
        let err = run_panicking(PanicIn::Replace).await;

        assert_eq!(err.kind(), ErrorKind::ActorPanic);
        match err {
            Error::ActorPanicked { actor, message } => {
                assert_eq!(actor, ActorRole::Mutator);
                assert_eq!(message, "replace exploded");
            }
            other => panic!("expected panic report, got {other:?}"),
        }
    }
}
