//! Document store adapter contracts.
//!
//! # Responsibility
//! - Define the `get/create/query/transact` surface the core relies on.
//! - Keep the backing engine (SQLite today) behind object-safe traits.
//!
//! # Invariants
//! - Writes inside a transaction are full-document overwrites.
//! - A write to a document read in the same transaction is conditional on
//!   the version observed by that read.
//! - A transaction body either commits as a whole or leaves no effect.

use crate::context::Cancellation;
use crate::db::DbError;
use crate::error::CoreResult;
use crate::model::ids::EntityId;
use crate::model::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// One stored document with the version used for conditional writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: Collection,
    pub id: EntityId,
    pub body: serde_json::Value,
    pub version: i64,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.body.clone()).map_err(StoreError::Serialization)
    }
}

/// Serializes a typed document body.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(StoreError::Serialization)
}

/// Scalar compared against a JSON field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

/// Collection-scoped document filter over top-level JSON fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document of the collection.
    All,
    /// Top-level field equals the value.
    FieldEquals {
        field: &'static str,
        value: FieldValue,
    },
    /// Some element of an array field matches all listed element fields.
    ArrayContains {
        array: &'static str,
        fields: Vec<(&'static str, FieldValue)>,
    },
    And(Vec<Filter>),
}

impl Filter {
    pub fn field_eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            field,
            value: FieldValue::Text(value.into()),
        }
    }
}

/// Operations available inside one store transaction.
pub trait DocumentTx {
    fn get(&mut self, collection: Collection, id: EntityId) -> StoreResult<Option<Document>>;
    /// Creates a new document. Fails with `AlreadyExists` on an existing id.
    fn insert(
        &mut self,
        collection: Collection,
        id: EntityId,
        body: &serde_json::Value,
    ) -> StoreResult<()>;
    /// Overwrites an existing document.
    fn set(&mut self, collection: Collection, id: EntityId, body: &serde_json::Value)
        -> StoreResult<()>;
    /// Removes a document. Returns whether it existed.
    fn delete(&mut self, collection: Collection, id: EntityId) -> StoreResult<bool>;
    fn query(&mut self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>>;
}

/// Transaction body driven by `DocumentStore::run_transaction`.
///
/// May run more than once when the store retries a conflicting attempt.
pub type TxBody<'a> = dyn FnMut(&mut dyn DocumentTx) -> CoreResult<()> + 'a;

/// Backing document store with transactional read-modify-write semantics.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Document>>;
    fn create(
        &self,
        collection: Collection,
        id: EntityId,
        body: &serde_json::Value,
    ) -> StoreResult<()>;
    fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>>;
    /// Runs `body` atomically, retrying on conflicts per the store's policy.
    ///
    /// Errors returned by `body` abort the attempt and are returned as-is
    /// unless they are retriable storage conflicts.
    fn run_transaction(&self, cancellation: &Cancellation, body: &mut TxBody<'_>)
        -> CoreResult<()>;
}

/// Runs a typed transaction body and returns its output.
pub fn transact<T>(
    store: &dyn DocumentStore,
    cancellation: &Cancellation,
    mut body: impl FnMut(&mut dyn DocumentTx) -> CoreResult<T>,
) -> CoreResult<T> {
    let mut output = None;
    store.run_transaction(cancellation, &mut |tx: &mut dyn DocumentTx| {
        output = Some(body(tx)?);
        Ok(())
    })?;
    output.ok_or(StoreError::MissingOutput.into())
}

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    /// Persisted row cannot be mapped back to a document.
    InvalidData(String),
    AlreadyExists { collection: Collection, id: EntityId },
    /// Overwrite target does not exist.
    Missing { collection: Collection, id: EntityId },
    /// Document changed since it was read in this transaction.
    Conflict { collection: Collection, id: EntityId },
    RetriesExhausted { attempts: u32, last: Box<StoreError> },
    Cancelled,
    /// Committed transaction produced no output; indicates a store bug.
    MissingOutput,
}

impl StoreError {
    /// Whether re-running the whole transaction may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document: {message}"),
            Self::AlreadyExists { collection, id } => {
                write!(f, "{collection} document already exists: {id}")
            }
            Self::Missing { collection, id } => {
                write!(f, "{collection} document missing on write: {id}")
            }
            Self::Conflict { collection, id } => {
                write!(f, "{collection} document {id} changed concurrently")
            }
            Self::RetriesExhausted { attempts, last } => {
                write!(f, "transaction failed after {attempts} attempts: {last}")
            }
            Self::Cancelled => write!(f, "transaction cancelled by caller"),
            Self::MissingOutput => write!(f, "transaction committed without output"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
