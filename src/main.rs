use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;
mod utils;

use api::AppState;
use config::{Config, StoreBackend};
use db::init_db;
use service::office_hours::FixedOfficeHours;
use store::SharedStore;
use store::cache::CachedStore;
use store::memory::MemoryDocumentStore;
use store::mysql::MySqlDocumentStore;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave & payroll service"
}

async fn build_store(config: &Config) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory document store; data is lost on restart");
            Arc::new(CachedStore::new(
                MemoryDocumentStore::new(),
                config.cache_ttl,
                config.cache_max_capacity,
            ))
        }
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await.context("Failed to connect to database")?;
            let mysql = MySqlDocumentStore::new(pool);
            mysql
                .ensure_schema()
                .await
                .context("Failed to create document table")?;
            Arc::new(CachedStore::new(mysql, config.cache_ttl, config.cache_max_capacity))
        }
    };
    Ok(store)
}

fn init_tracing(log_dir: &str) -> WorkerGuard {
    // Rolling daily log
    let file_appender = rolling::daily(log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    guard
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Subscriber must exist before from_env reports malformed values.
    let _guard = init_tracing(&Config::log_dir());
    let config = Config::from_env()?;

    info!(backend = config.store_backend.as_ref(), log_dir = %config.log_dir, "Server starting...");

    let store = build_store(&config).await?;
    let office_hours = Arc::new(FixedOfficeHours::new(
        config.office_start,
        i64::from(config.late_grace_minutes),
    ));
    let state = Data::new(AppState::new(store, office_hours));
    let config_data = Data::new(config.clone());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
