//! Store abstraction the verification protocol runs against
//!
//! The protocol only ever issues three operations: a lookup by unique name,
//! a replace keyed by internal identity, and an aggregate count. Creating
//! and seeding the collection goes through [`DatasetStore`], which the
//! actors never see.

use async_trait::async_trait;

use crate::domain::task::{StoredTask, TaskDocument, TaskFilter, TaskId, TaskName};
use crate::error::Result;

/// Whether a replace may insert when no document has the given identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Enabled,
    Disabled,
}

/// Counts reported by a replace, in document-store terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceOutcome {
    /// Documents whose identity matched
    pub matched: u64,
    /// Matched documents whose content actually changed
    pub modified: u64,
    /// Identity of a document created by the upsert, if one was
    pub upserted: Option<TaskId>,
}

impl ReplaceOutcome {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn inserted(id: TaskId) -> Self {
        Self {
            matched: 0,
            modified: 0,
            upserted: Some(id),
        }
    }

    pub fn matched(modified: u64) -> Self {
        Self {
            matched: 1,
            modified,
            upserted: None,
        }
    }
}

/// Operations the mutator and observer issue against the collection
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_name(&self, name: &TaskName) -> Result<Option<StoredTask>>;

    async fn replace_by_identity(
        &self,
        id: TaskId,
        document: &TaskDocument,
        upsert: Upsert,
    ) -> Result<ReplaceOutcome>;

    async fn count_where(&self, filter: TaskFilter) -> Result<u64>;
}

/// One-time setup operations used to provision a run
#[async_trait]
pub trait DatasetStore: TaskStore {
    /// Drop every document and recreate the collection and its indexes
    async fn reset(&self) -> Result<()>;

    /// Insert a new document; fails with `DuplicateName` if the name is taken
    async fn insert(&self, document: &TaskDocument) -> Result<TaskId>;
}
