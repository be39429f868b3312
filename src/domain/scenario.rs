//! Scenario parameters for one verification run
//!
//! Every tunable of the protocol lives here as a validated newtype so an
//! actor can never be constructed with a zero interval or an empty run.

use nutype::nutype;
use std::time::Duration;

use crate::domain::task::{TaskDocument, TaskName, TaskStatus};
use crate::error::{Error, Result};

/// Number of background (PENDING, ACTIVE, DONE) triples seeded before a run
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)
)]
pub struct BackgroundTriples(u32);

/// Number of ACTIVE/PENDING toggle cycles the mutator performs
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)
)]
pub struct CycleCount(u32);

/// Pause after each write of the target task
#[nutype(
    validate(predicate = |d| d.as_millis() > 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)
)]
pub struct MutationInterval(Duration);

/// Pause before each aggregate count
#[nutype(
    validate(predicate = |d| d.as_millis() > 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)
)]
pub struct ObservationInterval(Duration);

/// How often the coordinator inspects actor status
#[nutype(
    validate(predicate = |d| d.as_millis() > 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)
)]
pub struct PollInterval(Duration);

/// Wall-clock limit for a whole run
#[nutype(
    validate(predicate = |d| d.as_millis() > 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)
)]
pub struct RunTimeout(Duration);

/// Name of the task the mutator toggles unless configured otherwise
pub const DEFAULT_TARGET_NAME: &str = "my-task";

/// Fully validated parameters of a verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub background_triples: BackgroundTriples,
    pub cycles: CycleCount,
    pub mutation_interval: MutationInterval,
    pub observation_interval: ObservationInterval,
    pub poll_interval: PollInterval,
    pub run_timeout: Option<RunTimeout>,
    pub target_name: TaskName,
}

impl ScenarioConfig {
    /// Build a scenario, rejecting an observation interval that would not
    /// interleave reads between the mutator's writes.
    pub fn new(
        background_triples: BackgroundTriples,
        cycles: CycleCount,
        mutation_interval: MutationInterval,
        observation_interval: ObservationInterval,
        poll_interval: PollInterval,
        run_timeout: Option<RunTimeout>,
        target_name: TaskName,
    ) -> Result<Self> {
        if observation_interval.into_inner() >= mutation_interval.into_inner() {
            return Err(Error::invalid_input(
                "observation_interval",
                format!(
                    "must be shorter than the mutation interval ({:?} >= {:?})",
                    observation_interval.into_inner(),
                    mutation_interval.into_inner()
                ),
            ));
        }

        Ok(Self {
            background_triples,
            cycles,
            mutation_interval,
            observation_interval,
            poll_interval,
            run_timeout,
            target_name,
        })
    }

    /// Count of not-DONE tasks that must hold at every observation:
    /// two of every background triple plus the target.
    pub fn expected_undone_count(&self) -> u64 {
        u64::from(self.background_triples.into_inner()) * 2 + 1
    }

    /// Size of the seeded collection, target included
    pub fn total_records(&self) -> u64 {
        u64::from(self.background_triples.into_inner()) * 3 + 1
    }

    /// The immutable background set, in insertion order
    pub fn background_documents(&self) -> Result<Vec<TaskDocument>> {
        let triples = self.background_triples.into_inner();
        let mut documents = Vec::with_capacity(triples as usize * 3);
        for i in 0..triples {
            for (category, status) in [
                (1, TaskStatus::Pending),
                (2, TaskStatus::Active),
                (3, TaskStatus::Done),
            ] {
                let name = TaskName::try_new(format!("task-{category}-{i}"))
                    .map_err(|e| Error::invalid_input("task_name", e.to_string()))?;
                documents.push(TaskDocument::new(name, status));
            }
        }
        Ok(documents)
    }

    /// Initial state of the target task; it starts PENDING and never becomes DONE
    pub fn target_document(&self) -> TaskDocument {
        TaskDocument::new(self.target_name.clone(), TaskStatus::Pending)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            background_triples: BackgroundTriples::try_new(100).expect("100 triples is valid"),
            cycles: CycleCount::try_new(1000).expect("1000 cycles is valid"),
            mutation_interval: MutationInterval::try_new(Duration::from_millis(500))
                .expect("500ms is valid"),
            observation_interval: ObservationInterval::try_new(Duration::from_millis(250))
                .expect("250ms is valid"),
            poll_interval: PollInterval::try_new(Duration::from_secs(1)).expect("1s is valid"),
            run_timeout: None,
            target_name: TaskName::try_new(DEFAULT_TARGET_NAME.to_string())
                .expect("default target name is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_scenario_expects_201_undone_tasks() {
        let scenario = ScenarioConfig::default();
        assert_eq!(scenario.expected_undone_count(), 201);
        assert_eq!(scenario.total_records(), 301);
    }

    #[test]
    fn background_set_is_evenly_split() {
        let scenario = ScenarioConfig::default();
        let documents = scenario.background_documents().unwrap();
        assert_eq!(documents.len(), 300);
        for status in TaskStatus::ALL {
            assert_eq!(documents.iter().filter(|d| d.status == status).count(), 100);
        }
    }

    #[test]
    fn background_names_are_unique_and_exclude_target() {
        let scenario = ScenarioConfig::default();
        let names: HashSet<_> = scenario
            .background_documents()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names.len(), 300);
        assert!(!names.contains(&scenario.target_name));
    }

    #[test]
    fn target_starts_pending() {
        let target = ScenarioConfig::default().target_document();
        assert_eq!(target.status, TaskStatus::Pending);
        assert_eq!(target.name.as_ref(), DEFAULT_TARGET_NAME);
    }

    #[test]
    fn observation_must_be_faster_than_mutation() {
        let defaults = ScenarioConfig::default();
        let result = ScenarioConfig::new(
            defaults.background_triples,
            defaults.cycles,
            MutationInterval::try_new(Duration::from_millis(100)).unwrap(),
            ObservationInterval::try_new(Duration::from_millis(100)).unwrap(),
            defaults.poll_interval,
            None,
            defaults.target_name,
        );
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(BackgroundTriples::try_new(0).is_err());
        assert!(CycleCount::try_new(0).is_err());
        assert!(PollInterval::try_new(Duration::ZERO).is_err());
        assert!(RunTimeout::try_new(Duration::from_micros(10)).is_err());
    }
}
