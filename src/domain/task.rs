//! Task documents stored in the collection under test
//!
//! A task has an immutable unique name and a mutable status. The store
//! assigns each persisted task an internal identity which is what the
//! replace operation is keyed on.

use derive_more::Display;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Unique, human-readable task name
///
/// Limited to 256 characters so the name fits comfortably in a unique
/// index on every supported backend.
#[nutype(
    validate(not_empty, len_char_max = 256),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct TaskName(String);

/// Store-assigned internal identity of a persisted task
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn generate() -> Self {
        // v7 keeps ids roughly insertion ordered, which reads nicer in store dumps
        Self::new(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Lifecycle status of a task; `Done` is the only terminal state
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[display("PENDING")]
    Pending,
    #[display("ACTIVE")]
    Active,
    #[display("DONE")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::Active, TaskStatus::Done];

    /// Stored string form, identical to the serde representation
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Active => "ACTIVE",
            TaskStatus::Done => "DONE",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::invalid_input("status", format!("unknown task status '{s}'")))
    }
}

/// The document body persisted for each task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDocument {
    pub name: TaskName,
    pub status: TaskStatus,
}

impl TaskDocument {
    pub fn new(name: TaskName, status: TaskStatus) -> Self {
        Self { name, status }
    }

    /// Copy of this document with a different status; the name never changes
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            name: self.name.clone(),
            status,
        }
    }
}

/// A document together with the identity the store gave it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    pub id: TaskId,
    pub document: TaskDocument,
}

/// Predicate for aggregate counts over the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    StatusIs(TaskStatus),
    StatusIsNot(TaskStatus),
}

impl TaskFilter {
    /// Tasks that have not reached the terminal state
    pub fn undone() -> Self {
        TaskFilter::StatusIsNot(TaskStatus::Done)
    }

    pub fn matches(&self, document: &TaskDocument) -> bool {
        match self {
            TaskFilter::StatusIs(status) => document.status == *status,
            TaskFilter::StatusIsNot(status) => document.status != *status,
        }
    }
}
