use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use strum::EnumCount;
use tracing::{debug, warn};

use super::{Collection, Document, DocumentStore, Filter};
use crate::error::StoreError;

type DocKey = (Collection, String);
type ListKey = (Collection, String);

/// Read-through cache in front of any [`DocumentStore`].
///
/// Single documents and list results are cached with a TTL. A write to a
/// collection drops the written document and every cached list of that
/// collection, so readers never see a list that misses their own write.
///
/// Every write bumps its collection's generation before invalidating. A load
/// that overlaps a write of the same collection is returned to its caller but
/// never left in the cache.
pub struct CachedStore<S> {
    inner: S,
    docs: Cache<DocKey, Option<Value>>,
    lists: Cache<ListKey, Vec<Document>>,
    generations: [AtomicU64; Collection::COUNT],
}

impl<S: DocumentStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner,
            docs: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            lists: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
            generations: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    fn generation(&self, collection: Collection) -> u64 {
        self.generations[collection as usize].load(Ordering::Acquire)
    }

    fn list_key(collection: Collection, filters: &[Filter]) -> ListKey {
        let mut parts: Vec<String> = filters
            .iter()
            .map(|f| format!("{}={}", f.field, f.value))
            .collect();
        parts.sort();
        (collection, parts.join("&"))
    }

    async fn invalidate(&self, collection: Collection, id: &str) {
        self.generations[collection as usize].fetch_add(1, Ordering::AcqRel);
        self.docs.invalidate(&(collection, id.to_string())).await;
        if let Err(e) = self
            .lists
            .invalidate_entries_if(move |key, _| key.0 == collection)
        {
            // Fall back to dropping everything rather than serving stale lists.
            warn!(error = %e, collection = %collection, "List cache predicate rejected");
            self.lists.invalidate_all();
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CachedStore<S> {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let key = (collection, id.to_string());
        if let Some(hit) = self.docs.get(&key).await {
            return Ok(hit);
        }

        let started = self.generation(collection);
        let value = self.inner.get(collection, id).await?;
        if self.generation(collection) == started {
            self.docs.insert(key.clone(), value.clone()).await;
            // A write may have landed between the check and the insert.
            if self.generation(collection) != started {
                self.docs.invalidate(&key).await;
            }
        } else {
            debug!(collection = %collection, id, "Skipping cache fill after concurrent write");
        }
        Ok(value)
    }

    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let key = Self::list_key(collection, filters);
        if let Some(hit) = self.lists.get(&key).await {
            return Ok(hit);
        }

        let started = self.generation(collection);
        let docs = self.inner.list(collection, filters).await?;
        if self.generation(collection) == started {
            self.lists.insert(key.clone(), docs.clone()).await;
            if self.generation(collection) != started {
                self.lists.invalidate(&key).await;
            }
        }
        Ok(docs)
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<String, StoreError> {
        let id = self.inner.create(collection, data).await?;
        self.invalidate(collection, &id).await;
        Ok(id)
    }

    async fn upsert(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError> {
        let result = self.inner.upsert(collection, id, data).await;
        self.invalidate(collection, id).await;
        result
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        let result = self.inner.update(collection, id, partial).await;
        self.invalidate(collection, id).await;
        result
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete(collection, id).await;
        self.invalidate(collection, id).await;
        result
    }
}
