//! In-memory item store keyed by item id.
//!
//! Collections may be declared up front. A collection that items refer to
//! but nobody declared is still listed, as a bare record carrying its id.

use std::collections::BTreeMap;

use geocat_core::query::{matches_all, Predicate};
use geocat_core::{Collection, Item, ScanRequest, Store, StoreError};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, Item>>,
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later items replace earlier ones with the same id.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        Self {
            items: RwLock::new(items),
            collections: RwLock::default(),
        }
    }

    /// Declare collection records; later ones replace earlier ones by id.
    pub fn with_collections(self, collections: impl IntoIterator<Item = Collection>) -> Self {
        let declared = collections.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            collections: RwLock::new(declared),
            ..self
        }
    }

    pub async fn insert_collection(&self, collection: Collection) -> Option<Collection> {
        self.collections
            .write()
            .await
            .insert(collection.id.clone(), collection)
    }

    /// Insert or replace; returns the replaced item.
    pub async fn insert(&self, item: Item) -> Option<Item> {
        self.items.write().await.insert(item.id.clone(), item)
    }

    pub async fn extend(&self, items: impl IntoIterator<Item = Item>) {
        let mut guard = self.items.write().await;
        for item in items {
            guard.insert(item.id.clone(), item);
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Store for MemoryStore {
    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().await;
        let mut rows: Vec<&Item> = items.values().filter(|i| request.admits(i)).collect();
        rows.sort_by(|a, b| request.order.compare(a, b));
        rows.truncate(request.limit);
        tracing::trace!(rows = rows.len(), of = items.len(), "memory scan");
        Ok(rows.into_iter().cloned().collect())
    }

    async fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let items = self.items.read().await;
        Ok(items.values().filter(|i| matches_all(predicates, i)).count() as u64)
    }

    async fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn collections(&self) -> Result<Vec<Collection>, StoreError> {
        let items = self.items.read().await;
        let mut all = self.collections.read().await.clone();
        for item in items.values() {
            if !all.contains_key(&item.collection) {
                all.insert(item.collection.clone(), Collection::new(item.collection.clone()));
            }
        }
        Ok(all.into_values().collect())
    }

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>, StoreError> {
        if let Some(declared) = self.collections.read().await.get(id) {
            return Ok(Some(declared.clone()));
        }
        let items = self.items.read().await;
        Ok(items
            .values()
            .any(|i| i.collection == id)
            .then(|| Collection::new(id)))
    }
}
