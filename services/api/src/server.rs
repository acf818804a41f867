use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agent_rewards::config::{AppConfig, StoreConfig};
use agent_rewards::error::AppError;
use agent_rewards::store::{MemoryIdentityProvider, MemoryOutbox, MemoryStore};
use agent_rewards::telemetry;
use agent_rewards::workflows::points::RedemptionPolicy;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::rewards_app;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(url) = args.database_url.take() {
        config.store.database_url = Some(url);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policy = RedemptionPolicy::from_config(&config.rewards);
    let app = build_app(&config.store, policy)
        .await?
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agent rewards service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_app(store: &StoreConfig, policy: RedemptionPolicy) -> Result<Router, AppError> {
    use agent_rewards::store::PgStore;

    match &store.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, store.max_connections).await?;
            pg.migrate().await?;
            info!(max_connections = store.max_connections, "using postgres store");
            Ok(rewards_app(
                Arc::new(pg),
                Arc::new(MemoryIdentityProvider::default()),
                Arc::new(MemoryOutbox::default()),
                policy,
            ))
        }
        None => Ok(memory_app(policy)),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_app(store: &StoreConfig, policy: RedemptionPolicy) -> Result<Router, AppError> {
    if store.database_url.is_some() {
        warn!("DATABASE_URL is set but this build lacks the postgres feature; using the in-memory store");
    }
    Ok(memory_app(policy))
}

fn memory_app(policy: RedemptionPolicy) -> Router {
    warn!("using the in-memory store; data is lost on restart");
    rewards_app(
        Arc::new(MemoryStore::default()),
        Arc::new(MemoryIdentityProvider::default()),
        Arc::new(MemoryOutbox::default()),
        policy,
    )
}
