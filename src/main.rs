use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leavesync_backend::{
    callback::{self, CallbackProcessor, CallbackQueue},
    config::Config,
    crypto::CallbackCodec,
    routes,
    state::AppState,
    store::{ActiveIndexStore, CursorStore, LeaveStore},
    sync::{scheduler, SchedulerControl, SyncService},
    wecom::WecomClient,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leavesync_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        corp_id = %config.corp_id,
        secret = %mask_secret(&config.corp_secret),
        api_base = %config.api_base,
        data_dir = %config.data_dir.display(),
        time_zone = %config.time_zone,
        auto_sync_enabled = config.auto_sync_enabled,
        status_check_enabled = config.status_check_enabled,
        callback_configured = config.callback_credentials().is_some(),
        "Loaded configuration from environment/.env"
    );

    // Wire the sync engine
    let platform = Arc::new(WecomClient::new(
        &config.api_base,
        &config.corp_id,
        &config.corp_secret,
    )?);
    let service = Arc::new(SyncService::new(
        platform,
        LeaveStore::new(config.leave_file()),
        ActiveIndexStore::new(config.active_index_file(), config.active_cutoff_timestamp),
        CursorStore::new(config.cursor_file(), config.sync_baseline_timestamp),
        config.time_zone,
    ));
    let control = Arc::new(SchedulerControl::new(
        config.auto_sync_enabled,
        config.status_check_enabled,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // The callback pipeline only exists when its credentials do.
    let callbacks = match config.callback_credentials() {
        Some((token, aes_key)) => {
            let codec = CallbackCodec::new(token, aes_key, &config.corp_id)
                .map_err(|e| anyhow::anyhow!("Invalid callback credentials: {}", e))?;
            let processor = Arc::new(CallbackProcessor::new(
                codec,
                Arc::clone(&service),
                Arc::new(CallbackQueue::new()),
            ));
            callback::spawn_drain(Arc::clone(&processor), shutdown_rx.clone());
            Some(processor)
        }
        None => {
            tracing::warn!("Callback credentials missing, push endpoint disabled");
            None
        }
    };

    scheduler::spawn_schedulers(
        Arc::clone(&service),
        Arc::clone(&control),
        config.sync_interval.clone(),
        config.status_check_interval.clone(),
        shutdown_rx,
    );

    let bind_addr = config.bind_addr;
    let state = AppState::new(config, service, control, callbacks);
    let app = routes::router(state);

    // Start server
    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}
