//! Medication tracker REST API server.

use med_api::config::ApiConfig;
use med_api::server::{self, AppState};
use med_engine::MedicationEngine;
use med_notify::{ChannelNotifier, JsonlSink, NotificationSink, Notifier, TracingSink};
use med_types::MedTracker;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;

    let sink: Arc<dyn NotificationSink> = match &config.event_log {
        Some(path) => {
            tracing::info!(path = %path.display(), "writing events to JSONL");
            Arc::new(JsonlSink::new(path))
        }
        None => Arc::new(TracingSink),
    };
    let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(sink));

    let tracker = build_tracker(&config, notifier)?;
    let app = server::router(Arc::new(AppState { tracker }));

    tracing::info!(
        low_stock_threshold = ?config.engine.low_stock_threshold,
        "medication tracker listening on {}",
        config.listen
    );
    axum::serve(
        tokio::net::TcpListener::bind(config.listen).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}

#[cfg(feature = "sqlite")]
fn build_tracker(
    config: &ApiConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<Arc<dyn MedTracker>, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(path) = &config.sqlite_path {
        tracing::info!(path = %path.display(), "using SQLite store");
        let store = med_store::SqliteMedStore::new(path)?;
        return Ok(Arc::new(MedicationEngine::new(
            Arc::new(store),
            notifier,
            config.engine.clone(),
        )));
    }
    Ok(in_memory(config, notifier))
}

#[cfg(not(feature = "sqlite"))]
fn build_tracker(
    config: &ApiConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<Arc<dyn MedTracker>, Box<dyn std::error::Error + Send + Sync>> {
    if config.sqlite_path.is_some() {
        tracing::warn!("MEDTRACK_SQLITE_PATH ignored: built without the sqlite feature");
    }
    Ok(in_memory(config, notifier))
}

fn in_memory(config: &ApiConfig, notifier: Arc<dyn Notifier>) -> Arc<dyn MedTracker> {
    tracing::info!("using in-memory store");
    Arc::new(MedicationEngine::new(
        Arc::new(med_store::InMemoryMedStore::new()),
        notifier,
        config.engine.clone(),
    ))
}
