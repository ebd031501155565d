//! Document database access.
//!
//! Services talk to the managed document database only through
//! [`DocumentStore`]. Two backends exist: the Firestore REST API and an
//! in-memory store used for local runs and tests.

mod firestore;
mod memory;
mod query;
mod settings;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use settings::StoreSettings;
pub use memory::MemoryStore;
pub use query::{Direction, FieldFilter, FilterOp, OrderBy, Query};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const NOTIFICATIONS: &str = "notifications";
}

pub type Fields = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("failed to decode document: {0}")]
    Decode(String),

    #[error("watch closed")]
    Closed,
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document: its id plus its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    /// Deserialize into a model, exposing the document id as its `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Decode(format!("{}: {e}", self.id)))
    }
}

/// Serialize a model into document fields. The `id` field is dropped since
/// the id lives in the document name.
pub fn encode_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value).map_err(|e| StoreError::Decode(e.to_string()))? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Decode(format!("expected an object, got {other}"))),
    }
}

/// A single field change applied by [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    /// Append each element not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each element.
    ArrayRemove(Vec<Value>),
}

impl FieldUpdate {
    pub fn set(value: impl Serialize) -> StoreResult<Self> {
        serde_json::to_value(value)
            .map(Self::Set)
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    pub fn union_str(value: &str) -> Self {
        Self::ArrayUnion(vec![Value::String(value.to_string())])
    }

    pub fn remove_str(value: &str) -> Self {
        Self::ArrayRemove(vec![Value::String(value.to_string())])
    }

    /// Apply to the current value of a field.
    pub fn apply(&self, current: Option<&Value>) -> Value {
        match self {
            FieldUpdate::Set(v) => v.clone(),
            FieldUpdate::ArrayUnion(items) => {
                let mut array = match current {
                    Some(Value::Array(a)) => a.clone(),
                    _ => Vec::new(),
                };
                for item in items {
                    if !array.contains(item) {
                        array.push(item.clone());
                    }
                }
                Value::Array(array)
            }
            FieldUpdate::ArrayRemove(items) => {
                let array = match current {
                    Some(Value::Array(a)) => a.iter().filter(|v| !items.contains(v)).cloned().collect(),
                    _ => Vec::new(),
                };
                Value::Array(array)
            }
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create a document. A `None` id lets the store generate one; an
    /// explicit id that already exists is rejected.
    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> StoreResult<Document>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Apply field updates to an existing document and return the result.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> StoreResult<Document>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Current snapshot of a document followed by every later change.
    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, StoreResult<Option<Document>>>;

    /// Current query result followed by every later change.
    fn watch_query(&self, query: Query) -> BoxStream<'static, StoreResult<Vec<Document>>>;
}

#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn get_as<T>(&self, collection: &str, id: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(collection, id).await? {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }

    async fn query_as<T>(&self, query: &Query) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.query(query)
            .await?
            .iter()
            .map(|doc| doc.decode::<T>())
            .collect()
    }

    /// Like [`DocumentStoreExt::query_as`], but documents that fail to decode
    /// are logged and left out of the result.
    async fn query_as_lossy<T>(&self, query: &Query) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let docs = self.query(query).await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in &docs {
            match doc.decode::<T>() {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(
                    collection = %query.collection,
                    id = %doc.id,
                    error = %e,
                    "skipping undecodable document"
                ),
            }
        }
        Ok(items)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
