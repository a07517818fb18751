use anyhow::{bail, Result};
use anomaly_service::{
    config::AppConfig,
    observability,
    pipeline::{parse_day, AnalysisPipeline, AnalysisRequest, AnalysisSettings},
    store::PgConsumptionStore,
};
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: analyze_range <start YYYY-MM-DD> <end YYYY-MM-DD> [neighborhood]");
    }
    let start = parse_day(&args[1])?;
    let end = parse_day(&args[2])?;
    let request = AnalysisRequest::new(start, end, args.get(3).cloned())?;

    // Load configuration (ANALYTICS_CONFIG can point at another file).
    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let pipeline = AnalysisPipeline::new(
        Arc::new(PgConsumptionStore::new(pool)),
        AnalysisSettings::from(&cfg.analysis),
    );
    let report = pipeline.run(&request).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
