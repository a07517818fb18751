use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ANALYSIS_REQUESTS: &str = "analysis_requests_total";
pub const ANALYSIS_FAILURES: &str = "analysis_failures_total";
pub const ANALYSIS_DURATION: &str = "analysis_duration_seconds";
pub const ANOMALIES_DETECTED: &str = "anomalies_detected_total";

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder and serves `/metrics` on `bind_addr`.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{bind_addr}': {e}"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;

    // Only the first call wins; later handles are dropped.
    let _ = PROM_HANDLE.set(handle);
    describe();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics endpoint listening");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

fn describe() {
    metrics::describe_counter!(ANALYSIS_REQUESTS, "Anomaly analyses started");
    metrics::describe_counter!(ANALYSIS_FAILURES, "Anomaly analyses aborted by an error");
    metrics::describe_histogram!(ANALYSIS_DURATION, metrics::Unit::Seconds, "Wall time of one analysis");
    metrics::describe_counter!(ANOMALIES_DETECTED, "Anomalies emitted, labelled by kind");
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
