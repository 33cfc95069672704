//! In-process document store.
//!
//! Used for tests and local runs without a remote project. Ordering
//! within a collection follows document id.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::registry::TenantConnector;
use crate::store::{validate_id, Document, DocumentStore, Fields, StoreError, StoreResult, WriteMode};
use crate::tenant::ConnectionParams;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        let all = self.list(collection).await?;
        Ok(all
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_id(id)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields.clone());
        debug!(collection, id = %id, "memory store: added document");
        Ok(Document::new(id, fields))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, mode: WriteMode) -> StoreResult<()> {
        validate_id(id)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match mode {
            WriteMode::Replace => {
                docs.insert(id.to_string(), fields);
            }
            WriteMode::Merge => {
                let existing = docs.entry(id.to_string()).or_default();
                existing.extend(fields);
            }
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        validate_id(id)?;
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        existing.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        validate_id(id)?;
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

/// Hands out one shared [`MemoryStore`] per project id.
///
/// Stores survive across `connect` calls so tests can seed data before a
/// tenant is resolved.
#[derive(Default)]
pub struct MemoryConnector {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
    connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store backing `project_id`, created on first use.
    pub fn store(&self, project_id: &str) -> Arc<MemoryStore> {
        let mut stores = self.stores.lock();
        Arc::clone(stores.entry(project_id.to_string()).or_default())
    }

    /// How many times `connect` has been called.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl TenantConnector for MemoryConnector {
    fn connect(&self, params: &ConnectionParams) -> StoreResult<Arc<dyn DocumentStore>> {
        if params.project_id.trim().is_empty() {
            return Err(StoreError::invalid("connection parameters carry no project id"));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store: Arc<dyn DocumentStore> = self.store(&params.project_id);
        Ok(store)
    }
}
