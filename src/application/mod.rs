//! Application services and run orchestration
//!
//! This module contains the two actors of the verification protocol, the
//! coordinator that supervises them and the application wiring that builds
//! a store from configuration.

pub mod app;
pub mod coordinator;
pub mod mutator;
pub mod observer;
pub mod report;
pub mod status;

pub use app::Application;
pub use coordinator::Coordinator;
pub use mutator::Mutator;
pub use observer::Observer;
pub use report::RunReport;
pub use status::{ActorRole, MutatorState, ObserverState};
