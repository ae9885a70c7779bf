mod config;
mod db;
mod entities;
mod error;
mod forms;
mod models;
mod routes;
mod store;
mod templates;
mod upload;

use std::sync::Arc;

use tower_http::trace::TraceLayer;

use crate::{config::Config, store::MovieStore};

pub struct AppState {
    pub config: Arc<Config>,
    pub store: MovieStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reviewbox=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = MovieStore::new(db);

    let state = Arc::new(AppState { config: config.clone(), store });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(
        addr = %config.addr,
        upload_dir = %config.upload_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        "listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
