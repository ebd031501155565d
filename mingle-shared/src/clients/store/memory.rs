use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{Document, DocumentStore, FieldUpdate, Fields, Query, StoreError, StoreResult};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// Process-local document store. Watches are driven by a broadcast of the
/// collection name touched by every write.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
            }),
        }
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is watching.
        let _ = self.inner.changes.send(collection.to_string());
    }
}

impl Inner {
    async fn read_document(&self, collection: &str, id: &str) -> Option<Document> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    async fn run_query(&self, query: &Query) -> Vec<Document> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| query.matches(fields))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut docs, |d| &d.fields);
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        docs
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.inner.read_document(collection, id).await)
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> StoreResult<Document> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().simple().to_string());
        {
            let mut collections = self.inner.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            if docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id,
                });
            }
            docs.insert(id.clone(), fields.clone());
        }
        self.notify(collection);
        Ok(Document::new(id, fields))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.notify(collection);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> StoreResult<Document> {
        let fields = {
            let mut collections = self.inner.collections.write().await;
            let fields = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            for (field, update) in &updates {
                let next = update.apply(fields.get(field));
                fields.insert(field.clone(), next);
            }
            fields.clone()
        };
        self.notify(collection);
        Ok(Document::new(id, fields))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let removed = self
            .inner
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_some() {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        Ok(self.inner.run_query(query).await)
    }

    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, StoreResult<Option<Document>>> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let id = id.to_string();
        let mut changes = inner.changes.subscribe();

        async_stream::stream! {
            let mut last = inner.read_document(&collection, &id).await;
            yield Ok(last.clone());
            loop {
                match changes.recv().await {
                    Ok(touched) if touched != collection => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let current = inner.read_document(&collection, &id).await;
                        if current != last {
                            last = current.clone();
                            yield Ok(current);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    fn watch_query(&self, query: Query) -> BoxStream<'static, StoreResult<Vec<Document>>> {
        let inner = Arc::clone(&self.inner);
        let mut changes = inner.changes.subscribe();

        async_stream::stream! {
            let mut last = inner.run_query(&query).await;
            yield Ok(last.clone());
            loop {
                match changes.recv().await {
                    Ok(touched) if touched != query.collection => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let current = inner.run_query(&query).await;
                        if current != last {
                            last = current.clone();
                            yield Ok(current);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }
}
