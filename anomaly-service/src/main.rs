use anyhow::Result;
use anomaly_service::{
    api::{self, ApiState},
    config::AppConfig,
    metrics_server, observability,
    pipeline::{AnalysisPipeline, AnalysisSettings},
    store::{ConsumptionStore, PgConsumptionStore},
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Connections are opened on first use: an unreachable database fails
    // each request with a 500 instead of preventing startup.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect_lazy(&cfg.database.uri)?;

    let store: Arc<dyn ConsumptionStore> = Arc::new(PgConsumptionStore::new(pool));
    let pipeline = AnalysisPipeline::new(store, AnalysisSettings::from(&cfg.analysis));
    let state = ApiState::new(pipeline, &cfg.analysis)?;

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "anomaly service listening");

    axum::serve(listener, api::router(state).into_make_service()).await?;

    Ok(())
}
