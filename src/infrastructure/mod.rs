//! Infrastructure layer for the store concurrency harness
//!
//! This module contains the store backends the protocol runs against,
//! database connection handling and dataset provisioning.

pub mod database;
pub mod memory;
pub mod postgres;
pub mod provisioning;
pub mod store;

pub use database::*;
pub use memory::InMemoryTaskStore;
pub use postgres::{CollectionName, PostgresTaskStore};
pub use provisioning::{provision_dataset, ProvisionedDataset};
pub use store::*;
