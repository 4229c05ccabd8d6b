use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::error::StoreError;

pub async fn init_db(database_url: &str) -> Result<MySqlPool, StoreError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}
