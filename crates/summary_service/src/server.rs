use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use log::info;
use openrouter_client::{ClientConfig, OpenRouterClient, SummaryClientTrait};
use summary_engine::{AggregateStorage, MemoryAggregateStorage, SqliteAggregateStorage};

use crate::config::ServiceConfig;
use crate::controllers::{analysis_controller, summary_controller};

const DEFAULT_WORKER_COUNT: usize = 4;

pub struct AppState {
    pub summary_client: Arc<dyn SummaryClientTrait>,
    pub storage: Arc<dyn AggregateStorage>,
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(summary_controller::config)
            .configure(analysis_controller::config)
            .route("/health", web::get().to(health_check)),
    );
}

/// Build the aggregate store from configuration. With no database path the
/// service runs on the in-memory backend and stays fully functional, it just
/// loses history on restart.
pub fn build_storage(config: &ServiceConfig) -> Arc<dyn AggregateStorage> {
    match &config.db_path {
        Some(path) => {
            info!("aggregate store: sqlite at {}", path.display());
            Arc::new(SqliteAggregateStorage::new(path))
        }
        None => {
            info!("aggregate store: in-memory (no durable history)");
            Arc::new(MemoryAggregateStorage::new())
        }
    }
}

pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    info!("Starting summary service...");

    let summary_client: Arc<dyn SummaryClientTrait> = Arc::new(
        OpenRouterClient::new(ClientConfig::from_env())
            .context("failed to build OpenRouter client")?,
    );

    let storage = build_storage(&config);
    storage
        .init()
        .await
        .context("failed to initialize aggregate store")?;

    let app_state = web::Data::new(AppState {
        summary_client,
        storage,
    });

    let port = config.port;
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .workers(DEFAULT_WORKER_COUNT)
    .bind(("0.0.0.0", port))
    .with_context(|| format!("failed to bind port {}", port))?;

    info!("Summary service listening on port {}", port);
    server.run().await.context("server error")
}
