// src/bin/api_server.rs

use resource_controllers::infra::config;
use resource_controllers::transport::http::{create_router, TemplateDir};
use resource_controllers::{
    HtmlResourceController, InMemoryModel, JsonResourceController, PostgresModel, ResourceModel,
};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn build_model(table: &str) -> anyhow::Result<Arc<dyn ResourceModel>> {
    match config::database_url() {
        Some(url) => {
            tracing::info!(table, "using Postgres model");
            Ok(Arc::new(PostgresModel::connect(&url, table).await?))
        }
        None => {
            tracing::info!(table, "DATABASE_URL not set, using seeded in-memory model");
            let model = InMemoryModel::new(table).with_fields(["name", "email"]);
            model
                .seed([
                    json!({"name": "Ada", "email": "ada@example.com"}),
                    json!({"name": "Grace", "email": "grace@example.com"}),
                ])
                .await?;
            Ok(Arc::new(model))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- Model + controllers ---
    let table = config::resource_table();
    let model = build_model(&table).await?;

    let api = JsonResourceController::with_prefix(model.clone(), &[], &config::api_prefix());
    let views = Arc::new(TemplateDir::new(config::views_dir()));
    let pages = HtmlResourceController::with_prefix(model, views, &[], &config::html_prefix());

    // --- API Server Initialization ---
    let app = create_router(&[api.controller(), pages.controller()]);

    let addr = config::bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, api = %api.base(), html = %pages.base(), "listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
            }
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
