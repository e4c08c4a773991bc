pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod domain;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod store;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::integrity::IntegrityRecorder;
use crate::store::postgres::PgStore;
use crate::store::EngineStore;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let store: Arc<dyn EngineStore> = Arc::new(PgStore::new(db_pool));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (recorder, recorder_handle) = IntegrityRecorder::spawn(
        store.clone(),
        settings.engine().recorder_queue_capacity,
        shutdown_rx.clone(),
    );

    let state = AppState::new(settings, store, recorder);
    let watchdog_handle = tasks::scheduler::spawn(state.clone(), shutdown_rx);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Examgate API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }
    for handle in [watchdog_handle, recorder_handle] {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    result?;

    Ok(())
}
