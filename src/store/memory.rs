use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Filter, merge_patch, with_id};
use crate::error::StoreError;

type Collections = HashMap<Collection, BTreeMap<String, Value>>;

/// In-process store. Backs the `memory` backend and the test suites.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        Ok(guard.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        let Some(docs) = guard.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let data = with_id(data, &id)?;
        let mut guard = self.collections.write().map_err(poisoned)?;
        guard.entry(collection).or_default().insert(id.clone(), data);
        Ok(id)
    }

    async fn upsert(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError> {
        let data = with_id(data, id)?;
        let mut guard = self.collections.write().map_err(poisoned)?;
        guard.entry(collection).or_default().insert(id.to_string(), data);
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        match guard.get_mut(&collection).and_then(|docs| docs.get_mut(id)) {
            Some(doc) => {
                merge_patch(doc, partial)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        Ok(guard
            .get_mut(&collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_web::test]
    async fn create_assigns_id_and_get_returns_it() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create(Collection::Employees, json!({"name": "Karim"}))
            .await
            .unwrap();

        let doc = store.get(Collection::Employees, &id).await.unwrap().unwrap();
        assert_eq!(doc["id"], json!(id));
        assert_eq!(doc["name"], json!("Karim"));
    }

    #[actix_web::test]
    async fn missing_documents_are_data_not_errors() {
        let store = MemoryDocumentStore::new();
        assert!(store.get(Collection::Employees, "nope").await.unwrap().is_none());
        assert!(!store.update(Collection::Employees, "nope", json!({"a": 1})).await.unwrap());
        assert!(!store.delete(Collection::Employees, "nope").await.unwrap());
    }

    #[actix_web::test]
    async fn list_applies_all_filters() {
        let store = MemoryDocumentStore::new();
        store
            .upsert(Collection::LeaveRequests, "l1", json!({"employee_id": "e1", "status": "approved"}))
            .await
            .unwrap();
        store
            .upsert(Collection::LeaveRequests, "l2", json!({"employee_id": "e1", "status": "rejected"}))
            .await
            .unwrap();
        store
            .upsert(Collection::LeaveRequests, "l3", json!({"employee_id": "e2", "status": "approved"}))
            .await
            .unwrap();

        let docs = store
            .list(
                Collection::LeaveRequests,
                &[Filter::eq("employee_id", "e1"), Filter::eq("status", "approved")],
            )
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "l1");
    }

    #[actix_web::test]
    async fn update_merges_into_existing_document() {
        let store = MemoryDocumentStore::new();
        store
            .upsert(Collection::PayrollRecords, "p1", json!({"ait": 0, "status": "pending"}))
            .await
            .unwrap();

        assert!(store
            .update(Collection::PayrollRecords, "p1", json!({"status": "approved"}))
            .await
            .unwrap());

        let doc = store.get(Collection::PayrollRecords, "p1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"id": "p1", "ait": 0, "status": "approved"}));
    }
}
