//! Momenarr - personal media-acquisition controller.
//!
//! Wires the tracking source, indexer, downloader, and repositories together
//! behind the Orchestrator's four-stage pipeline, and exposes the webhook
//! surface the downloader calls back into on completion.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use momenarr_api::ApiState;
use momenarr_core::{AppConfig, Blacklist, HealthState, MediaRepo, MomenarrError, NzbRepo, Result, TrackingSource};
use momenarr_decision::{SelectionConfig, SelectionEngine, Thresholds};
use momenarr_downloaders::{Dispatcher, DispatcherConfig, NzbgetClient, NzbgetConfig};
use momenarr_indexers::{NewznabClient, NewznabConfig};
use momenarr_infrastructure::trakt::TraktClient;
use momenarr_infrastructure::{create_pool, migrate, SqliteMediaRepo, SqliteNzbRepo};
use momenarr_notifications::{NotificationConfig, NotificationHandler};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cleanup_service;
mod orchestrator;
mod sync_service;

use cleanup_service::CleanupService;
use orchestrator::Orchestrator;
use sync_service::SyncService;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    info!("momenarr starting up");

    let pool = create_pool(&config.data_db_path()).await?;
    migrate(&pool).await?;

    let blacklist = Blacklist::load(&config.blacklist_path())?;

    let trakt_client = Arc::new(TraktClient::new(
        config.tracking.trakt_api_key.clone(),
        config.tracking.trakt_client_secret.clone(),
        config.token_path(),
    ));
    if let Err(e) = trakt_client.load_or_bootstrap().await {
        error!(error = %e, "no Trakt token on disk; run the trakt-auth binary first");
        return Err(e);
    }
    let tracking: Arc<dyn TrackingSource> = trakt_client.clone();

    let searcher = Arc::new(NewznabClient::new(NewznabConfig {
        host: config.indexer.newznab_host.clone(),
        api_key: config.indexer.newznab_api_key.clone(),
        timeout: config.pipeline.http_timeout,
    })?);

    let downloader = Arc::new(NzbgetClient::new(NzbgetConfig {
        base_url: config.downloader.nzbget_url.clone(),
        username: config.downloader.nzbget_user.clone(),
        password: config.downloader.nzbget_pass.clone(),
        timeout: config.pipeline.http_timeout.as_secs(),
    })?);

    let media_repo: Arc<dyn MediaRepo> = Arc::new(SqliteMediaRepo::new(pool.clone()));
    let nzb_repo: Arc<dyn NzbRepo> = Arc::new(SqliteNzbRepo::new(pool.clone()));

    let selection = Arc::new(SelectionEngine::new(
        searcher,
        media_repo.clone(),
        nzb_repo.clone(),
        blacklist,
        SelectionConfig {
            thresholds: Thresholds {
                title_similarity_min: config.validation.title_similarity_min,
                year_tolerance: config.validation.year_tolerance,
                min_validation_score: config.validation.min_validation_score,
            },
            min_quality_score: config.validation.min_quality_score,
            min_total_score: config.validation.min_total_score,
            guid_prefix: config.indexer.newznab_host.clone(),
        },
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        downloader.clone(),
        media_repo.clone(),
        DispatcherConfig {
            category: config.pipeline.nzb_category.clone(),
            dupe_mode: config.pipeline.nzb_dupe_mode.clone(),
            http_timeout: config.pipeline.http_timeout,
        },
    )?);

    let notifications = Arc::new(NotificationHandler::new(
        media_repo.clone(),
        nzb_repo.clone(),
        downloader.clone(),
        dispatcher.clone(),
        selection.clone(),
        NotificationConfig {
            category: config.pipeline.nzb_category.clone(),
            retry_count: config.pipeline.retry_count,
            retry_delay: config.pipeline.retry_delay,
        },
    ));

    let sync_service = Arc::new(SyncService::new(
        tracking.clone(),
        media_repo.clone(),
        config.pipeline.next_episodes_count,
    ));
    let cleanup_service = Arc::new(CleanupService::new(
        tracking.clone(),
        media_repo.clone(),
        nzb_repo.clone(),
        config.pipeline.history_lookback_days,
    ));

    let health = HealthState::new();
    let orchestrator = Arc::new(Orchestrator::new(
        media_repo.clone(),
        sync_service,
        selection,
        dispatcher,
        cleanup_service,
        health.clone(),
        config.pipeline.task_interval,
    ));

    let cancellation = CancellationToken::new();

    let orchestrator_handle = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let cancellation = cancellation.clone();
        async move { orchestrator.run(cancellation).await }
    });

    let token_refresh_handle = tokio::spawn({
        let trakt_client = trakt_client.clone();
        let cancellation = cancellation.clone();
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(15 * 60));
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = trakt_client.ensure_fresh_token().await {
                            warn!(error = %e, "background Trakt token refresh failed");
                        }
                    }
                }
            }
        }
    });

    let api_state = ApiState::new(notifications, health.clone());
    let app = momenarr_api::create_router(api_state);

    let addr: SocketAddr = config.server.bind_addr.parse().map_err(|e| MomenarrError::Configuration {
        field: "server.bind_addr".to_string(),
        message: format!("invalid bind address {}: {e}", config.server.bind_addr),
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "webhook surface listening");

    let shutdown_cancellation = cancellation.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_cancellation.cancel();
        })
        .await?;

    info!("http server stopped, waiting for background tasks to finish");
    let shutdown_deadline = Duration::from_secs(30);
    let _ = tokio::time::timeout(shutdown_deadline, async {
        let _ = orchestrator_handle.await;
        let _ = token_refresh_handle.await;
    })
    .await;

    info!("momenarr shut down");
    Ok(())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}
