//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents in the `documents` table keyed by `(collection, id)`.
//! - Run transaction bodies under `BEGIN IMMEDIATE` with bounded retry.
//!
//! # Invariants
//! - Every successful write bumps the row `version`.
//! - In-memory stores share exactly one connection; file stores pool
//!   connections up to `StoreOptions::max_pool_size` idle handles.

use super::{
    Document, DocumentStore, DocumentTx, FieldValue, Filter, StoreError, StoreResult, TxBody,
};
use crate::config::{RetryPolicy, StoreOptions};
use crate::context::Cancellation;
use crate::db::{open_db, open_db_in_memory};
use crate::error::{CoreError, CoreResult};
use crate::model::ids::EntityId;
use crate::model::Collection;
use log::{debug, error, warn};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT id, body, version FROM documents";

enum ConnectionPool {
    Shared(Mutex<Connection>),
    File {
        path: PathBuf,
        busy_timeout: Duration,
        max_idle: usize,
        idle: Mutex<Vec<Connection>>,
    },
}

impl ConnectionPool {
    fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> T) -> StoreResult<T> {
        match self {
            Self::Shared(conn) => Ok(f(&mut conn.lock())),
            Self::File {
                path,
                busy_timeout,
                max_idle,
                idle,
            } => {
                let pooled = idle.lock().pop();
                let mut conn = match pooled {
                    Some(conn) => conn,
                    None => open_db(path, *busy_timeout)?,
                };
                let output = f(&mut conn);
                let mut idle = idle.lock();
                if idle.len() < *max_idle {
                    idle.push(conn);
                }
                Ok(output)
            }
        }
    }
}

/// Document store over one SQLite database.
pub struct SqliteDocumentStore {
    pool: ConnectionPool,
    retry: RetryPolicy,
}

impl SqliteDocumentStore {
    /// Opens (and migrates) a database file shared by pooled connections.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let first = open_db(&path, options.busy_timeout)?;
        Ok(Self {
            pool: ConnectionPool::File {
                path,
                busy_timeout: options.busy_timeout,
                max_idle: options.max_pool_size.max(1),
                idle: Mutex::new(vec![first]),
            },
            retry: options.retry,
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(options: &StoreOptions) -> StoreResult<Self> {
        let conn = open_db_in_memory(options.busy_timeout)?;
        Ok(Self {
            pool: ConnectionPool::Shared(Mutex::new(conn)),
            retry: options.retry,
        })
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Document>> {
        self.pool
            .with_connection(|conn| select_document(conn, collection, id))?
    }

    fn create(
        &self,
        collection: Collection,
        id: EntityId,
        body: &serde_json::Value,
    ) -> StoreResult<()> {
        self.pool
            .with_connection(|conn| insert_document(conn, collection, id, body))?
    }

    fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.pool
            .with_connection(|conn| query_documents(conn, collection, filter))?
    }

    fn run_transaction(
        &self,
        cancellation: &Cancellation,
        body: &mut TxBody<'_>,
    ) -> CoreResult<()> {
        let started_at = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if cancellation.is_cancelled() {
                return Err(StoreError::Cancelled.into());
            }

            let outcome = self
                .pool
                .with_connection(|conn| run_attempt(conn, cancellation, &mut *body))?;

            match outcome {
                Ok(()) => {
                    debug!(
                        "event=store_tx module=store status=ok attempts={} duration_ms={}",
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(());
                }
                Err(CoreError::Storage(err)) if err.is_retriable() => {
                    if attempt >= self.retry.max_attempts {
                        error!(
                            "event=store_tx module=store status=error attempts={} duration_ms={} error_code=retries_exhausted error={}",
                            attempt,
                            started_at.elapsed().as_millis(),
                            err
                        );
                        return Err(StoreError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        }
                        .into());
                    }
                    warn!(
                        "event=store_tx module=store status=retry attempt={} error={}",
                        attempt, err
                    );
                    std::thread::sleep(self.retry.delay_for_attempt(attempt));
                }
                Err(err) => {
                    debug!(
                        "event=store_tx module=store status=aborted attempts={} error_code={}",
                        attempt,
                        err.code()
                    );
                    return Err(err);
                }
            }
        }
    }
}

fn run_attempt(
    conn: &mut Connection,
    cancellation: &Cancellation,
    body: &mut TxBody<'_>,
) -> CoreResult<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::from)?;
    {
        let mut doc_tx = SqliteTx {
            conn: &tx,
            observed: HashMap::new(),
        };
        body(&mut doc_tx)?;
    }
    if cancellation.is_cancelled() {
        return Err(StoreError::Cancelled.into());
    }
    tx.commit().map_err(StoreError::from)?;
    Ok(())
}

/// Transaction-scoped view that tracks versions read for conditional writes.
struct SqliteTx<'t> {
    conn: &'t Connection,
    observed: HashMap<(Collection, EntityId), i64>,
}

impl DocumentTx for SqliteTx<'_> {
    fn get(&mut self, collection: Collection, id: EntityId) -> StoreResult<Option<Document>> {
        let document = select_document(self.conn, collection, id)?;
        if let Some(document) = document.as_ref() {
            self.observed.insert((collection, id), document.version);
        }
        Ok(document)
    }

    fn insert(
        &mut self,
        collection: Collection,
        id: EntityId,
        body: &serde_json::Value,
    ) -> StoreResult<()> {
        insert_document(self.conn, collection, id, body)?;
        self.observed.insert((collection, id), 1);
        Ok(())
    }

    fn set(
        &mut self,
        collection: Collection,
        id: EntityId,
        body: &serde_json::Value,
    ) -> StoreResult<()> {
        let expected = self.observed.get(&(collection, id)).copied();
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?3,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?1
               AND id = ?2
               AND (?4 IS NULL OR version = ?4);",
            params![collection.as_str(), id.to_string(), body.to_string(), expected],
        )?;

        if changed == 0 {
            return Err(match expected {
                Some(_) => StoreError::Conflict { collection, id },
                None => StoreError::Missing { collection, id },
            });
        }

        if let Some(version) = expected {
            self.observed.insert((collection, id), version + 1);
        }
        Ok(())
    }

    fn delete(&mut self, collection: Collection, id: EntityId) -> StoreResult<bool> {
        let expected = self.observed.remove(&(collection, id));
        let changed = self.conn.execute(
            "DELETE FROM documents
             WHERE collection = ?1
               AND id = ?2
               AND (?3 IS NULL OR version = ?3);",
            params![collection.as_str(), id.to_string(), expected],
        )?;

        if changed == 0 && expected.is_some() {
            return Err(StoreError::Conflict { collection, id });
        }
        Ok(changed > 0)
    }

    fn query(&mut self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        let documents = query_documents(self.conn, collection, filter)?;
        for document in &documents {
            self.observed
                .insert((collection, document.id), document.version);
        }
        Ok(documents)
    }
}

fn select_document(
    conn: &Connection,
    collection: Collection,
    id: EntityId,
) -> StoreResult<Option<Document>> {
    let mut stmt = conn.prepare(&format!(
        "{DOCUMENT_SELECT_SQL} WHERE collection = ?1 AND id = ?2;"
    ))?;
    let document = stmt
        .query_row(params![collection.as_str(), id.to_string()], |row| {
            read_row(row)
        })
        .optional()?;
    document
        .map(|(id, body, version)| parse_document(collection, &id, &body, version))
        .transpose()
}

fn insert_document(
    conn: &Connection,
    collection: Collection,
    id: EntityId,
    body: &serde_json::Value,
) -> StoreResult<()> {
    let changed = conn.execute(
        "INSERT INTO documents (collection, id, body)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (collection, id) DO NOTHING;",
        params![collection.as_str(), id.to_string(), body.to_string()],
    )?;
    if changed == 0 {
        return Err(StoreError::AlreadyExists { collection, id });
    }
    Ok(())
}

fn query_documents(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
) -> StoreResult<Vec<Document>> {
    let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE collection = ?");
    let mut bind_values = vec![SqlValue::Text(collection.as_str().to_string())];
    sql.push_str(" AND ");
    render_filter(filter, &mut sql, &mut bind_values);
    sql.push_str(" ORDER BY rowid ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let (id, body, version) = read_row(row)?;
        documents.push(parse_document(collection, &id, &body, version)?);
    }
    Ok(documents)
}

fn render_filter(filter: &Filter, sql: &mut String, bind_values: &mut Vec<SqlValue>) {
    match filter {
        Filter::All => sql.push_str("1 = 1"),
        Filter::FieldEquals { field, value } => {
            sql.push_str(&format!("json_extract(body, '$.{field}') = ?"));
            bind_values.push(field_value_to_sql(value));
        }
        Filter::ArrayContains { array, fields } => {
            sql.push_str(&format!(
                "EXISTS (SELECT 1 FROM json_each(documents.body, '$.{array}') AS element WHERE 1 = 1"
            ));
            for (field, value) in fields {
                sql.push_str(&format!(
                    " AND json_extract(element.value, '$.{field}') = ?"
                ));
                bind_values.push(field_value_to_sql(value));
            }
            sql.push(')');
        }
        Filter::And(filters) => {
            sql.push('(');
            if filters.is_empty() {
                sql.push_str("1 = 1");
            }
            for (index, inner) in filters.iter().enumerate() {
                if index > 0 {
                    sql.push_str(" AND ");
                }
                render_filter(inner, sql, bind_values);
            }
            sql.push(')');
        }
    }
}

fn field_value_to_sql(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Text(text) => SqlValue::Text(text.clone()),
        // json_extract yields 1/0 for JSON true/false.
        FieldValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, i64)> {
    Ok((row.get("id")?, row.get("body")?, row.get("version")?))
}

fn parse_document(
    collection: Collection,
    id: &str,
    body: &str,
    version: i64,
) -> StoreResult<Document> {
    let id = Uuid::parse_str(id).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id}` in {collection}.id"))
    })?;
    let body = serde_json::from_str(body).map_err(StoreError::Serialization)?;
    Ok(Document {
        collection,
        id,
        body,
        version,
    })
}
