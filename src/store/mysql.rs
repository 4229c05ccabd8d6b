use async_trait::async_trait;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::debug;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Filter, merge_patch, with_id};
use crate::error::StoreError;

/// All collections share one table; `data` holds the JSON payload.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR(64) NOT NULL,
    id VARCHAR(128) NOT NULL,
    data JSON NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    PRIMARY KEY (collection, id)
)
"#;

#[derive(Clone)]
pub struct MySqlDocumentStore {
    pool: MySqlPool,
}

impl MySqlDocumentStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

fn parse(raw: &str) -> Result<Value, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

/// Field names become JSON paths, so only plain identifiers are accepted.
fn json_path(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::Backend(format!("invalid filter field: {}", field)));
    }
    Ok(format!("$.{}", field))
}

#[async_trait]
impl DocumentStore for MySqlDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT CAST(data AS CHAR)
            FROM documents
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(collection.as_ref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(raw,)| parse(&raw)).transpose()
    }

    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let mut where_sql = String::from(" WHERE collection = ?");
        let mut args: Vec<(String, String)> = Vec::with_capacity(filters.len());

        for filter in filters {
            where_sql.push_str(" AND JSON_EXTRACT(data, ?) = CAST(? AS JSON)");
            args.push((json_path(&filter.field)?, filter.value.to_string()));
        }

        let sql = format!(
            "SELECT id, CAST(data AS CHAR) FROM documents{} ORDER BY id",
            where_sql
        );
        debug!(sql = %sql, collection = %collection, "Listing documents");

        let mut query = sqlx::query_as::<_, (String, String)>(&sql).bind(collection.as_ref());
        for (path, value) in args {
            query = query.bind(path).bind(value);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(id, raw)| Ok(Document { id, data: parse(&raw)? }))
            .collect()
    }

    async fn create(&self, collection: Collection, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let data = with_id(data, &id)?;

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection.as_ref())
            .bind(&id)
            .bind(serde_json::to_string(&data)?)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn upsert(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError> {
        let data = with_id(data, id)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE data = VALUES(data)
            "#,
        )
        .bind(collection.as_ref())
        .bind(id)
        .bind(serde_json::to_string(&data)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        // Read-modify-write; concurrent edits to one document are last-write-wins.
        let Some(mut current) = self.get(collection, id).await? else {
            return Ok(false);
        };
        merge_patch(&mut current, partial)?;

        sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&current)?)
            .bind(collection.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_path_accepts_identifiers_only() {
        assert_eq!(json_path("employee_id").unwrap(), "$.employee_id");
        assert!(json_path("a.b").is_err());
        assert!(json_path("x') OR 1=1 --").is_err());
        assert!(json_path("").is_err());
    }
}
