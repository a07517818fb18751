use serde::Deserialize;
use std::fs;

use crate::detect::SuddenIncreaseScope;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// `YYYY-MM-DD`, used when a request omits `startDate`.
    pub default_start_date: String,
    /// `YYYY-MM-DD`, used when a request omits `endDate`.
    pub default_end_date: String,
    pub max_buckets: i64,
    pub max_anomalies: usize,
    pub max_locations: usize,
    pub sudden_increase_scope: SuddenIncreaseScope,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_start_date: "2022-01-01".to_string(),
            default_end_date: "2022-12-31".to_string(),
            max_buckets: consumption_client::domain::DEFAULT_BUCKET_LIMIT,
            max_anomalies: 100,
            max_locations: 50,
            sudden_increase_scope: SuddenIncreaseScope::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ANALYTICS_CONFIG").unwrap_or_else(|_| "analytics-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
