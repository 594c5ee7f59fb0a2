use crate::dates;
use crate::model::{StudentStatus, STUDENTS};
use crate::query::{self, Condition};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
    #[error("invalid document id: {0:?}")]
    InvalidId(String),
    #[error("document {collection}/{id} is not a JSON object")]
    Corrupt { collection: String, id: String },
    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),
    #[error("write failed: {0}")]
    Write(#[source] rusqlite::Error),
    #[error("delete failed: {0}")]
    Delete(#[source] rusqlite::Error),
    #[error("document json: {0}")]
    Json(#[from] serde_json::Error),
}

/// One stored record. `data` always carries `id`, `createdAt` and `updatedAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.data.clone())
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.data)
    }
}

/// Collection-by-name access to documents keyed by id.
pub trait DocumentStore {
    fn read_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Full overwrite. `createdAt` survives from the previous version if any.
    fn write(
        &self,
        collection: &str,
        id: &str,
        record: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    /// Returns whether a document was there to delete.
    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    fn collections(&self) -> Result<Vec<(String, usize)>, StoreError>;

    /// Always a full collection scan; conditions are evaluated in memory.
    fn read_filtered(
        &self,
        collection: &str,
        conditions: &[Condition],
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.read_all(collection)?;
        if conditions.is_empty() {
            return Ok(docs);
        }
        Ok(docs
            .into_iter()
            .filter(|d| query::matches_all(conditions, &Value::Object(d.data.clone())))
            .collect())
    }
}

/// Number of matching documents. Downloads the whole result set, no pagination.
pub fn count(
    store: &dyn DocumentStore,
    collection: &str,
    conditions: &[Condition],
) -> Result<usize, StoreError> {
    Ok(store.read_filtered(collection, conditions)?.len())
}

pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.trim().is_empty() || collection.contains('/') {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

// Students keep one status spelling; legacy booleans become "active"/"inactive".
fn normalize_status(collection: &str, record: &mut Map<String, Value>) {
    if collection != STUDENTS {
        return;
    }
    let Some(raw) = record.get("status") else {
        return;
    };
    if let Ok(status) = StudentStatus::deserialize(raw) {
        record.insert("status".into(), Value::String(status.as_str().to_string()));
    }
}

fn stamp(record: &mut Map<String, Value>, id: &str, created_at: &str, updated_at: &str) {
    record.insert("id".into(), Value::String(id.to_string()));
    record.insert("createdAt".into(), Value::String(created_at.to_string()));
    record.insert("updatedAt".into(), Value::String(updated_at.to_string()));
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn decode(&self, collection: &str, id: String, body: &str) -> Result<Document, StoreError> {
        match serde_json::from_str::<Value>(body)? {
            Value::Object(data) => Ok(Document { id, data }),
            _ => Err(StoreError::Corrupt {
                collection: collection.to_string(),
                id,
            }),
        }
    }
}

impl DocumentStore for SqliteStore<'_> {
    fn read_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid")
            .map_err(StoreError::Query)?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(StoreError::Query)?;

        rows.into_iter()
            .map(|(id, body)| self.decode(collection, id, &body))
            .collect()
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |r| r.get(0),
            )
            .optional()
            .map_err(StoreError::Query)?;
        body.map(|b| self.decode(collection, id.to_string(), &b))
            .transpose()
    }

    fn write(
        &self,
        collection: &str,
        id: &str,
        mut record: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        validate_collection(collection)?;
        validate_id(id)?;

        let tx = self.conn.unchecked_transaction().map_err(StoreError::Write)?;
        let existing_created: Option<String> = tx
            .query_row(
                "SELECT created_at FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |r| r.get(0),
            )
            .optional()
            .map_err(StoreError::Query)?;

        let now = dates::now_rfc3339();
        let created_at = existing_created.unwrap_or_else(|| now.clone());
        normalize_status(collection, &mut record);
        stamp(&mut record, id, &created_at, &now);
        let body = serde_json::to_string(&record)?;

        tx.execute(
            "INSERT INTO documents(collection, id, body, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            (collection, id, &body, &created_at, &now),
        )
        .map_err(StoreError::Write)?;
        tx.commit().map_err(StoreError::Write)?;

        tracing::info!(collection, id, "document written");
        Ok(Document {
            id: id.to_string(),
            data: record,
        })
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        validate_collection(collection)?;
        let n = self
            .conn
            .execute(
                "DELETE FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
            )
            .map_err(StoreError::Delete)?;
        tracing::info!(collection, id, existed = n > 0, "document deleted");
        Ok(n > 0)
    }

    fn collections(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT collection, COUNT(*) FROM documents
                 GROUP BY collection ORDER BY collection",
            )
            .map_err(StoreError::Query)?;
        stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((name, count.max(0) as usize))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
    }
}
