//! The reader half of the protocol
//!
//! Counts not-DONE tasks over and over while the mutator writes. The loop
//! only ends on a violation, a store error or shutdown.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::application::status::{ObserverState, Shutdown, StatusPublisher};
use crate::domain::invariant::UndoneCountInvariant;
use crate::domain::scenario::ScenarioConfig;
use crate::domain::task::TaskFilter;
use crate::infrastructure::store::TaskStore;

pub struct Observer<S: ?Sized> {
    store: Arc<S>,
    invariant: UndoneCountInvariant,
    interval: Duration,
    status: StatusPublisher<ObserverState>,
    shutdown: Shutdown,
}

impl<S> Observer<S>
where
    S: TaskStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        scenario: &ScenarioConfig,
        status: StatusPublisher<ObserverState>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            store,
            invariant: UndoneCountInvariant::new(scenario.expected_undone_count()),
            interval: scenario.observation_interval.into_inner(),
            status,
            shutdown,
        }
    }

    #[instrument(name = "observer", skip(self), fields(expected = self.invariant.expected()))]
    pub async fn run(mut self) -> ObserverState {
        info!("Observer started");

        let mut queries: u64 = 0;
        let state = loop {
            let observations = queries;

            tokio::select! {
                biased;
                _ = self.shutdown.triggered() => {
                    break ObserverState::Stopped { observations };
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            queries += 1;
            match self.store.count_where(TaskFilter::undone()).await {
                Ok(observed) => match self.invariant.check(observed, queries) {
                    Ok(()) => {
                        debug!(queries, observed, "Count consistent");
                        self.status.publish(ObserverState::Consistent {
                            observations: queries,
                        });
                    }
                    Err(violation) => {
                        warn!(%violation, "Invariant violated");
                        break ObserverState::Violated(violation);
                    }
                },
                Err(err) => {
                    error!(queries, error = %err, "Observer stopped on error");
                    break ObserverState::Errored {
                        observations,
                        error: Arc::new(err),
                    };
                }
            }
        };

        if let ObserverState::Stopped { observations } = state {
            info!(observations, "Observer stopped");
        }
        self.status.publish(state.clone());
        state
    }
}
