mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use treats_api::auth::AppStateInner;
use treats_api::routes::router;
use treats_api::scheduler::Scheduler;
use treats_store::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treats=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Restore the workspace
    let store = Arc::new(match &config.data_path {
        Some(path) => Store::open(path, &config.default_profile_img_url())?,
        None => {
            info!("No data path configured; state lives in memory only");
            Store::in_memory(&config.default_profile_img_url())
        }
    });

    let (scheduler, scheduler_task) = Scheduler::start(store.clone());
    let app_state = Arc::new(AppStateInner {
        store: store.clone(),
        scheduler,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Treats server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Jobs still queued are lost with the process.
    scheduler_task.abort();
    let store_for_save = store.clone();
    match tokio::task::spawn_blocking(move || store_for_save.save()).await {
        Ok(Ok(())) => info!("Final snapshot written"),
        Ok(Err(e)) => error!("Failed to write final snapshot: {:#}", e),
        Err(e) => error!("spawn_blocking join error: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
