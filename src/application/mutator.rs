//! The writer half of the protocol
//!
//! Toggles the target task between ACTIVE and PENDING for a fixed number
//! of cycles. Every write must modify exactly one document; anything else
//! means the store lost, duplicated or dropped an update.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::application::status::{MutatorState, StatusPublisher};
use crate::domain::scenario::ScenarioConfig;
use crate::domain::task::{TaskName, TaskStatus};
use crate::error::{Error, Result};
use crate::infrastructure::store::{TaskStore, Upsert};

/// The two statuses written per cycle, in order
const CYCLE: [TaskStatus; 2] = [TaskStatus::Active, TaskStatus::Pending];

pub struct Mutator<S: ?Sized> {
    store: Arc<S>,
    target: TaskName,
    cycles: u32,
    interval: Duration,
    status: StatusPublisher<MutatorState>,
}

impl<S> Mutator<S>
where
    S: TaskStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        scenario: &ScenarioConfig,
        status: StatusPublisher<MutatorState>,
    ) -> Self {
        Self {
            store,
            target: scenario.target_name.clone(),
            cycles: scenario.cycles.into_inner(),
            interval: scenario.mutation_interval.into_inner(),
            status,
        }
    }

    /// Run every cycle, publishing progress; returns the terminal state
    #[instrument(name = "mutator", skip(self), fields(target = %self.target, cycles = self.cycles))]
    pub async fn run(self) -> MutatorState {
        info!("Mutator started");

        let mut cycles_completed = 0;
        let state = loop {
            if cycles_completed == self.cycles {
                break MutatorState::Succeeded { cycles_completed };
            }

            if let Err(err) = self.cycle().await {
                error!(cycles_completed, error = %err, "Mutator stopped on error");
                break MutatorState::Failed {
                    cycles_completed,
                    error: Arc::new(err),
                };
            }

            cycles_completed += 1;
            self.status.publish(MutatorState::Running { cycles_completed });
        };

        if let MutatorState::Succeeded { cycles_completed } = state {
            info!(cycles_completed, "Mutator finished all cycles");
        }
        self.status.publish(state.clone());
        state
    }

    async fn cycle(&self) -> Result<()> {
        for status in CYCLE {
            self.write_status(status).await?;
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }

    /// Look the target up by name and replace it with the new status
    async fn write_status(&self, status: TaskStatus) -> Result<()> {
        let task = self
            .store
            .find_by_name(&self.target)
            .await?
            .ok_or_else(|| Error::TargetNotFound {
                name: self.target.clone(),
            })?;

        let outcome = self
            .store
            .replace_by_identity(task.id, &task.document.with_status(status), Upsert::Enabled)
            .await?;

        if outcome.modified != 1 {
            return Err(Error::WriteAnomaly {
                name: self.target.clone(),
                status,
                modified: outcome.modified,
            });
        }

        debug!(%status, "Target updated");
        Ok(())
    }
}
