use std::{sync::Arc, time::Instant};

use consumption_client::domain::{BucketQuery, ConsumptionBucket};
use serde::Serialize;
use time::{macros::format_description, Date};

use crate::{
    config::AnalysisConfig,
    detect::{Anomaly, Evaluator, SuddenIncreaseScope},
    enrich::{enrich_all, Directory},
    metrics_server::{ANALYSIS_DURATION, ANALYSIS_FAILURES, ANALYSIS_REQUESTS, ANOMALIES_DETECTED},
    store::{ConsumptionStore, StoreError},
    summary::{
        address_leaderboard, neighborhood_stats, summarize, timeline, AddressLeaderboardEntry, AnomalySummary,
        NeighborhoodStat, TimelineEntry,
    },
};

/// Neighborhood filter value that disables filtering.
pub const ALL_NEIGHBORHOODS: &str = "all";

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("directory fetch failed: {0}")]
    Directory(#[source] StoreError),
    #[error("aggregation failed: {0}")]
    Aggregation(#[source] StoreError),
}

/// Parses a `YYYY-MM-DD` day.
pub fn parse_day(value: &str) -> Result<Date, PipelineError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| PipelineError::InvalidRequest(format!("invalid date '{value}': {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub start: Date,
    pub end: Date,
    pub neighborhood: Option<String>,
}

impl AnalysisRequest {
    /// `neighborhood` of `None`, blank or [`ALL_NEIGHBORHOODS`] means no filter.
    pub fn new(start: Date, end: Date, neighborhood: Option<String>) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let neighborhood = neighborhood.filter(|n| !n.trim().is_empty() && n != ALL_NEIGHBORHOODS);
        Ok(Self { start, end, neighborhood })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisSettings {
    pub max_buckets: i64,
    pub max_anomalies: usize,
    pub max_locations: usize,
    pub sudden_increase_scope: SuddenIncreaseScope,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalysisSettings {
    fn from(cfg: &AnalysisConfig) -> Self {
        Self {
            max_buckets: cfg.max_buckets,
            max_anomalies: cfg.max_anomalies,
            max_locations: cfg.max_locations,
            sudden_increase_scope: cfg.sudden_increase_scope,
        }
    }
}

/// Response payload of one analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub success: bool,
    /// Number of aggregated buckets analysed.
    pub total_records: usize,
    /// The first anomalies in evaluation order.
    pub anomalies: Vec<Anomaly>,
    pub top_locations: Vec<AddressLeaderboardEntry>,
    pub neighborhood_stats: Vec<NeighborhoodStat>,
    pub timeline: Vec<TimelineEntry>,
    pub summary: AnomalySummary,
}

/// Directory fetch → aggregation → enrichment → rules → summaries.
#[derive(Clone)]
pub struct AnalysisPipeline {
    store: Arc<dyn ConsumptionStore>,
    settings: AnalysisSettings,
}

impl AnalysisPipeline {
    pub fn new(store: Arc<dyn ConsumptionStore>, settings: AnalysisSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn ConsumptionStore> {
        &self.store
    }

    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisReport, PipelineError> {
        metrics::counter!(ANALYSIS_REQUESTS).increment(1);
        let started = Instant::now();

        let result = self.execute(request).await;

        metrics::histogram!(ANALYSIS_DURATION).record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!(ANALYSIS_FAILURES).increment(1);
            tracing::error!(error = %e, "anomaly analysis failed");
        }
        result
    }

    async fn execute(&self, request: &AnalysisRequest) -> Result<AnalysisReport, PipelineError> {
        tracing::info!(
            start = %request.start,
            end = %request.end,
            neighborhood = request.neighborhood.as_deref().unwrap_or(ALL_NEIGHBORHOODS),
            "starting anomaly analysis"
        );

        let query = BucketQuery::new(request.start, request.end).with_limit(self.settings.max_buckets);

        // The owner filter comes from the directory, so a neighborhood
        // request cannot fetch both halves concurrently.
        let (directory, buckets) = match &request.neighborhood {
            Some(neighborhood) => {
                let directory = self.load_directory().await?;
                let owners = directory.owners_in(neighborhood);
                tracing::info!(%neighborhood, owners = owners.len(), "resolved neighborhood owners");
                let buckets = self.load_buckets(&query.with_owners(owners)).await?;
                (directory, buckets)
            }
            None => tokio::try_join!(self.load_directory(), self.load_buckets(&query))?,
        };

        let total_records = buckets.len();
        let enriched = enrich_all(buckets, &directory);
        let anomalies = Evaluator::new(self.settings.sudden_increase_scope).evaluate(&enriched);
        for a in &anomalies {
            metrics::counter!(ANOMALIES_DETECTED, "kind" => a.kind.as_str()).increment(1);
        }

        let summary = summarize(&anomalies);
        tracing::info!(
            total_records,
            anomalies = summary.total_anomalies,
            high = summary.high_alerts,
            medium = summary.medium_alerts,
            "anomaly analysis completed"
        );

        Ok(AnalysisReport {
            success: true,
            total_records,
            neighborhood_stats: neighborhood_stats(&enriched, &anomalies),
            top_locations: address_leaderboard(&anomalies, self.settings.max_locations),
            timeline: timeline(&anomalies),
            summary,
            anomalies: anomalies.into_iter().take(self.settings.max_anomalies).collect(),
        })
    }

    async fn load_directory(&self) -> Result<Directory, PipelineError> {
        let clients = self.store.clients().await.map_err(PipelineError::Directory)?;
        let directory = Directory::from_clients(clients);
        tracing::info!(clients = directory.len(), "client directory loaded");
        Ok(directory)
    }

    async fn load_buckets(&self, query: &BucketQuery) -> Result<Vec<ConsumptionBucket>, PipelineError> {
        let buckets = self.store.buckets(query).await.map_err(PipelineError::Aggregation)?;
        if i64::try_from(buckets.len()).map_or(true, |n| n >= query.limit) {
            tracing::warn!(limit = query.limit, "bucket cap reached, results may be incomplete");
        }
        tracing::info!(buckets = buckets.len(), "consumption buckets aggregated");
        Ok(buckets)
    }
}
