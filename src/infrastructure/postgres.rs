//! PostgreSQL-backed document store
//!
//! Each task is one row holding a JSONB document keyed by a UUID. Name
//! uniqueness and the status lookup are expression indexes over the
//! document, so the table behaves like a document collection.

use async_trait::async_trait;
use nutype::nutype;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::task::{StoredTask, TaskDocument, TaskFilter, TaskId, TaskName};
use crate::error::{Error, Result};
use crate::infrastructure::store::{DatasetStore, ReplaceOutcome, TaskStore, Upsert};

/// Table name used as the collection; interpolated into DDL so it is
/// restricted to a plain SQL identifier.
#[nutype(
    validate(not_empty, len_char_max = 63, regex = r"^[a-zA-Z_][a-zA-Z0-9_]*$"),
    derive(Debug, Clone, PartialEq, Eq, Hash, AsRef, Display)
)]
pub struct CollectionName(String);

pub struct PostgresTaskStore {
    pool: PgPool,
    collection: CollectionName,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool, collection: CollectionName) -> Self {
        Self { pool, collection }
    }

    /// Create the collection table and its indexes if they are missing
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn ensure_schema(&self) -> Result<()> {
        let table = self.collection.as_ref();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                document JSONB NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_name_idx ON {table} ((document->>'name'))"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_status_idx ON {table} ((document->>'status'))"
        ))
        .execute(&self.pool)
        .await?;

        debug!("Collection schema ready");
        Ok(())
    }

    fn decode(id: Uuid, document: serde_json::Value) -> Result<StoredTask> {
        Ok(StoredTask {
            id: TaskId::new(id),
            document: serde_json::from_value(document)?,
        })
    }

    fn map_unique_violation(err: sqlx::Error, name: &TaskName) -> Error {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Error::DuplicateName { name: name.clone() };
            }
        }
        Error::Database(err)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn find_by_name(&self, name: &TaskName) -> Result<Option<StoredTask>> {
        let row = sqlx::query(&format!(
            "SELECT id, document FROM {} WHERE document->>'name' = $1 LIMIT 1",
            self.collection
        ))
        .bind(name.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::decode(
                row.try_get("id")?,
                row.try_get("document")?,
            )?)),
            None => Ok(None),
        }
    }

    async fn replace_by_identity(
        &self,
        id: TaskId,
        document: &TaskDocument,
        upsert: Upsert,
    ) -> Result<ReplaceOutcome> {
        let table = self.collection.as_ref();
        let body = serde_json::to_value(document)?;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(&format!(
            "SELECT document FROM {table} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_ref())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match (existing, upsert) {
            (None, Upsert::Disabled) => ReplaceOutcome::unmatched(),
            (None, Upsert::Enabled) => {
                sqlx::query(&format!(
                    "INSERT INTO {table} (id, document) VALUES ($1, $2)"
                ))
                .bind(id.as_ref())
                .bind(&body)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::map_unique_violation(e, &document.name))?;
                ReplaceOutcome::inserted(id)
            }
            (Some(_), _) => {
                let result = sqlx::query(&format!(
                    "UPDATE {table} SET document = $2 WHERE id = $1 AND document IS DISTINCT FROM $2"
                ))
                .bind(id.as_ref())
                .bind(&body)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::map_unique_violation(e, &document.name))?;
                ReplaceOutcome::matched(result.rows_affected())
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn count_where(&self, filter: TaskFilter) -> Result<u64> {
        let (predicate, status) = match filter {
            TaskFilter::StatusIs(status) => ("=", status),
            TaskFilter::StatusIsNot(status) => ("IS DISTINCT FROM", status),
        };

        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} WHERE document->>'status' {predicate} $1",
            self.collection
        ))
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        u64::try_from(count).map_err(|_| Error::store(format!("negative count {count}")))
    }
}

#[async_trait]
impl DatasetStore for PostgresTaskStore {
    async fn reset(&self) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.collection))
            .execute(&self.pool)
            .await?;
        self.ensure_schema().await
    }

    async fn insert(&self, document: &TaskDocument) -> Result<TaskId> {
        let id = TaskId::generate();
        sqlx::query(&format!(
            "INSERT INTO {} (id, document) VALUES ($1, $2)",
            self.collection
        ))
        .bind(id.as_ref())
        .bind(serde_json::to_value(document)?)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, &document.name))?;
        Ok(id)
    }
}
