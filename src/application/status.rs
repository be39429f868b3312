//! Status shared between the actors and the coordinator
//!
//! Each actor owns the sending half of a `watch` channel and publishes its
//! state there; the coordinator only ever reads the latest value. The
//! shutdown signal runs the other way, from the coordinator to the actors.

use derive_more::Display;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::invariant::Violation;
use crate::error::Error;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRole {
    #[display("Mutator")]
    Mutator,
    #[display("Observer")]
    Observer,
}

/// Lifecycle of the mutator; `Succeeded` and `Failed` are terminal
#[derive(Debug, Clone)]
pub enum MutatorState {
    Running { cycles_completed: u32 },
    Succeeded { cycles_completed: u32 },
    Failed {
        cycles_completed: u32,
        error: Arc<Error>,
    },
}

impl MutatorState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, MutatorState::Running { .. })
    }

    pub fn cycles_completed(&self) -> u32 {
        match self {
            MutatorState::Running { cycles_completed }
            | MutatorState::Succeeded { cycles_completed }
            | MutatorState::Failed {
                cycles_completed, ..
            } => *cycles_completed,
        }
    }
}

/// Lifecycle of the observer.
///
/// `Consistent` is the only non-terminal state. `Stopped` means the run
/// was shut down while every observation still matched, which keeps a
/// graceful shutdown distinguishable from a detected violation.
#[derive(Debug, Clone)]
pub enum ObserverState {
    Consistent { observations: u64 },
    Violated(Violation),
    Errored { observations: u64, error: Arc<Error> },
    Stopped { observations: u64 },
}

impl ObserverState {
    /// Observations whose count matched the invariant
    pub fn successful_observations(&self) -> u64 {
        match self {
            ObserverState::Consistent { observations }
            | ObserverState::Errored { observations, .. }
            | ObserverState::Stopped { observations } => *observations,
            ObserverState::Violated(violation) => violation.successful_observations(),
        }
    }

    /// The failure this state represents, if it is a failed terminal state
    pub fn failure(&self) -> Option<Error> {
        match self {
            ObserverState::Violated(violation) => Some(Error::actor(
                ActorRole::Observer,
                Arc::new(Error::InvariantViolation(violation.clone())),
            )),
            ObserverState::Errored { error, .. } => {
                Some(Error::actor(ActorRole::Observer, Arc::clone(error)))
            }
            ObserverState::Consistent { .. } | ObserverState::Stopped { .. } => None,
        }
    }
}

/// Publishing half of an actor's status
#[derive(Debug)]
pub struct StatusPublisher<T> {
    tx: watch::Sender<T>,
}

impl<T> StatusPublisher<T> {
    pub fn publish(&self, state: T) {
        // Nobody listening just means the coordinator is gone; the state is
        // still recorded on the sender for later subscribers.
        self.tx.send_replace(state);
    }
}

/// Read-only view of an actor's latest status
#[derive(Debug, Clone)]
pub struct StatusWatcher<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> StatusWatcher<T> {
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }
}

pub fn status_channel<T>(initial: T) -> (StatusPublisher<T>, StatusWatcher<T>) {
    let (tx, rx) = watch::channel(initial);
    (StatusPublisher { tx }, StatusWatcher { rx })
}

/// Coordinator-side handle used to stop the actors
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Actor-side view of the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested or the trigger was dropped
    pub async fn triggered(&mut self) {
        // An Err means the trigger was dropped, which also ends the run
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}
