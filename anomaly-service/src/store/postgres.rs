use consumption_client::db::{client_queries, consumption_queries};
use consumption_client::domain::{BucketQuery, ClientRecord, ConsumptionBucket, ConsumptionEvent};
use sqlx::postgres::PgPool;

use super::{ConsumptionStore, StoreError};

pub struct PgConsumptionStore {
    pool: PgPool,
}

impl PgConsumptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Connection-level failures mean the database was never reached; anything
/// else is a failure of the query itself.
fn classify(err: anyhow::Error) -> StoreError {
    let unreachable = matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
    );
    if unreachable {
        StoreError::Unreachable(format!("{err:#}"))
    } else {
        StoreError::Query(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for PgConsumptionStore {
    async fn clients(&self) -> Result<Vec<ClientRecord>, StoreError> {
        client_queries::load_clients(&self.pool).await.map_err(classify)
    }

    async fn client(&self, owner_id: &str) -> Result<Option<ClientRecord>, StoreError> {
        client_queries::find_client(&self.pool, owner_id).await.map_err(classify)
    }

    async fn neighborhoods(&self) -> Result<Vec<String>, StoreError> {
        client_queries::distinct_neighborhoods(&self.pool).await.map_err(classify)
    }

    async fn buckets(&self, query: &BucketQuery) -> Result<Vec<ConsumptionBucket>, StoreError> {
        consumption_queries::aggregate_buckets(&self.pool, query)
            .await
            .map_err(classify)
    }

    async fn recent_events(&self, owner_id: &str, limit: i64) -> Result<Vec<ConsumptionEvent>, StoreError> {
        consumption_queries::recent_events(&self.pool, owner_id, limit)
            .await
            .map_err(classify)
    }
}
