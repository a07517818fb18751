//! The storage seam: the client directory and the consumption time series.

pub mod memory;
pub mod postgres;

use consumption_client::domain::{BucketQuery, ClientRecord, ConsumptionBucket, ConsumptionEvent};

pub use memory::InMemoryStore;
pub use postgres::PgConsumptionStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    #[error("query failed: {0}")]
    Query(String),
}

#[async_trait::async_trait]
pub trait ConsumptionStore: Send + Sync {
    /// Every directory row.
    async fn clients(&self) -> Result<Vec<ClientRecord>, StoreError>;

    async fn client(&self, owner_id: &str) -> Result<Option<ClientRecord>, StoreError>;

    /// Distinct non-empty neighborhoods of the directory, sorted.
    async fn neighborhoods(&self) -> Result<Vec<String>, StoreError>;

    /// (owner, day, hour) buckets ordered by that key, at most `query.limit`.
    async fn buckets(&self, query: &BucketQuery) -> Result<Vec<ConsumptionBucket>, StoreError>;

    /// Raw events of one owner, newest first.
    async fn recent_events(&self, owner_id: &str, limit: i64) -> Result<Vec<ConsumptionEvent>, StoreError>;
}
