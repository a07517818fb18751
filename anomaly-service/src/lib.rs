pub mod api;
pub mod config;
pub mod detect;
pub mod enrich;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod store;
pub mod summary;

pub use pipeline::{AnalysisPipeline, AnalysisReport, AnalysisRequest};
