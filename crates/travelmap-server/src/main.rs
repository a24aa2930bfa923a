mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use travelmap_collector::{Collector, CollectorSettings, DispatchMode, PgStore};
use travelmap_core::AppConfig;
use travelmap_detect::{CountryDetector, PatternCatalog};
use travelmap_youtube::YouTubeClient;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = travelmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = travelmap_db::PoolConfig::from_app_config(&config);
    let pool = travelmap_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = travelmap_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let detector = Arc::new(CountryDetector::new(
        PatternCatalog::builtin(),
        &config.home_country,
    )?);
    let collector = build_collector(&config, pool.clone(), Arc::clone(&detector))?;

    let _scheduler = match &collector {
        Some(collector) => Some(
            scheduler::build_scheduler(Arc::clone(collector), &config.schedule)
                .await
                .context("failed to start scheduler")?,
        ),
        None => {
            tracing::warn!("YOUTUBE_API_KEY not set; collection endpoints and scheduler disabled");
            None
        }
    };

    let app = build_app(
        AppState {
            pool,
            detector,
            collector,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// `None` when no API key is configured.
fn build_collector(
    config: &AppConfig,
    pool: sqlx::PgPool,
    detector: Arc<CountryDetector>,
) -> anyhow::Result<Option<Arc<Collector>>> {
    let Some(api_key) = config.youtube_api_key.as_deref() else {
        return Ok(None);
    };

    let client = YouTubeClient::with_base_url(
        api_key,
        config.youtube_timeout_secs,
        &config.youtube_base_url,
    )?
    .with_retry(config.youtube_max_retries, config.youtube_backoff_base_ms);

    Ok(Some(Arc::new(Collector::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(client),
        detector,
        CollectorSettings::from_app_config(config),
        DispatchMode::Background {
            capacity: config.detection_queue_capacity,
        },
    ))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
