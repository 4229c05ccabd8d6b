//! Generic document persistence.
//!
//! Every entity lives in a named [`Collection`] as a JSON document keyed by a
//! string id. Backends only move JSON around; typed decoding and shape
//! validation happen in [`fetch`] / [`fetch_all`] so that nothing downstream
//! trusts a stored document blindly.

pub mod cache;
pub mod memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumCount, EnumString};

use crate::error::{ServiceError, ServiceResult, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr, EnumCount)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Employees,
    LeaveRequests,
    Attendance,
    PayrollRecords,
    PayrollSettings,
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Backends stamp the document id into the payload under this key.
pub const ID_FIELD: &str = "id";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError>;

    /// Inserts under a freshly generated id and returns it.
    async fn create(&self, collection: Collection, data: Value) -> Result<String, StoreError>;

    /// Creates or replaces the document stored under `id`.
    async fn upsert(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError>;

    /// Merges `partial` into an existing document. `Ok(false)` when absent.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// A typed record persisted in exactly one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Cross-field checks run after a stored document is decoded.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn decode<T: Entity>(id: &str, data: Value) -> ServiceResult<T> {
    let entity: T = serde_json::from_value(data).map_err(|e| {
        ServiceError::validation(format!("malformed {} document {}: {}", T::COLLECTION, id, e))
    })?;

    entity.validate().map_err(|e| {
        ServiceError::validation(format!("malformed {} document {}: {}", T::COLLECTION, id, e))
    })?;

    Ok(entity)
}

pub async fn fetch<T: Entity>(store: &dyn DocumentStore, id: &str) -> ServiceResult<Option<T>> {
    match store.get(T::COLLECTION, id).await? {
        Some(data) => decode(id, data).map(Some),
        None => Ok(None),
    }
}

pub async fn fetch_required<T: Entity>(store: &dyn DocumentStore, id: &str) -> ServiceResult<T> {
    fetch(store, id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("{} {} not found", T::COLLECTION, id)))
}

pub async fn fetch_all<T: Entity>(
    store: &dyn DocumentStore,
    filters: &[Filter],
) -> ServiceResult<Vec<T>> {
    store
        .list(T::COLLECTION, filters)
        .await?
        .into_iter()
        .map(|doc| decode(&doc.id, doc.data))
        .collect()
}

/// Writes the whole entity under its own id.
pub async fn save<T: Entity>(store: &dyn DocumentStore, entity: &T) -> ServiceResult<()> {
    let data = serde_json::to_value(entity).map_err(StoreError::from)?;
    store.upsert(T::COLLECTION, entity.id(), data).await?;
    Ok(())
}

/// Shallow JSON merge patch: `null` removes a key, anything else replaces it.
pub fn merge_patch(target: &mut Value, partial: Value) -> Result<(), StoreError> {
    let Value::Object(patch) = partial else {
        return Err(StoreError::Backend("update payload must be a JSON object".into()));
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(doc) = target {
        for (key, value) in patch {
            if key == ID_FIELD {
                continue;
            }
            if value.is_null() {
                doc.remove(&key);
            } else {
                doc.insert(key, value);
            }
        }
    }

    Ok(())
}

/// Stamps `id` into an object payload.
pub fn with_id(mut data: Value, id: &str) -> Result<Value, StoreError> {
    match data.as_object_mut() {
        Some(obj) => {
            obj.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            Ok(data)
        }
        None => Err(StoreError::Backend("document payload must be a JSON object".into())),
    }
}
