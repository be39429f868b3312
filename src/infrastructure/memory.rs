//! In-process document store
//!
//! Keeps documents behind a single `parking_lot::RwLock`, so every count
//! sees a point-in-time snapshot. Replace follows document-store rules:
//! rewriting identical content matches but does not modify.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::task::{StoredTask, TaskDocument, TaskFilter, TaskId, TaskName, TaskStatus};
use crate::error::{Error, Result};
use crate::infrastructure::store::{DatasetStore, ReplaceOutcome, TaskStore, Upsert};

#[derive(Debug, Default)]
struct Collection {
    documents: HashMap<TaskId, TaskDocument>,
    names: HashMap<TaskName, TaskId>,
}

impl Collection {
    fn insert(&mut self, id: TaskId, document: TaskDocument) -> Result<()> {
        if self.names.contains_key(&document.name) {
            return Err(Error::DuplicateName {
                name: document.name,
            });
        }
        self.names.insert(document.name.clone(), id);
        self.documents.insert(id, document);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    collection: RwLock<Collection>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.collection.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite a task's status outside the protocol, for fault injection.
    /// Returns the previous status.
    pub fn overwrite_status(&self, name: &TaskName, status: TaskStatus) -> Result<TaskStatus> {
        let mut collection = self.collection.write();
        let id = *collection
            .names
            .get(name)
            .ok_or_else(|| Error::TargetNotFound { name: name.clone() })?;
        let document = collection
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::store(format!("name index points at missing task {id}")))?;
        Ok(std::mem::replace(&mut document.status, status))
    }

    /// Remove a task outright, for fault injection
    pub fn remove(&self, name: &TaskName) -> Option<TaskDocument> {
        let mut collection = self.collection.write();
        let id = collection.names.remove(name)?;
        collection.documents.remove(&id)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_by_name(&self, name: &TaskName) -> Result<Option<StoredTask>> {
        let collection = self.collection.read();
        Ok(collection.names.get(name).and_then(|id| {
            collection.documents.get(id).map(|document| StoredTask {
                id: *id,
                document: document.clone(),
            })
        }))
    }

    async fn replace_by_identity(
        &self,
        id: TaskId,
        document: &TaskDocument,
        upsert: Upsert,
    ) -> Result<ReplaceOutcome> {
        let mut collection = self.collection.write();

        let Some(existing) = collection.documents.get(&id).cloned() else {
            return match upsert {
                Upsert::Enabled => {
                    collection.insert(id, document.clone())?;
                    Ok(ReplaceOutcome::inserted(id))
                }
                Upsert::Disabled => Ok(ReplaceOutcome::unmatched()),
            };
        };

        if existing == *document {
            return Ok(ReplaceOutcome::matched(0));
        }

        if existing.name != document.name {
            if collection.names.contains_key(&document.name) {
                return Err(Error::DuplicateName {
                    name: document.name.clone(),
                });
            }
            collection.names.remove(&existing.name);
            collection.names.insert(document.name.clone(), id);
        }
        collection.documents.insert(id, document.clone());
        Ok(ReplaceOutcome::matched(1))
    }

    async fn count_where(&self, filter: TaskFilter) -> Result<u64> {
        let collection = self.collection.read();
        Ok(collection
            .documents
            .values()
            .filter(|document| filter.matches(document))
            .count() as u64)
    }
}

#[async_trait]
impl DatasetStore for InMemoryTaskStore {
    async fn reset(&self) -> Result<()> {
        *self.collection.write() = Collection::default();
        Ok(())
    }

    async fn insert(&self, document: &TaskDocument) -> Result<TaskId> {
        let id = TaskId::generate();
        self.collection.write().insert(id, document.clone())?;
        Ok(id)
    }
}
