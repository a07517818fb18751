use std::collections::BTreeSet;

use consumption_client::domain::{bucketize, BucketQuery, ClientRecord, ConsumptionBucket, ConsumptionEvent};

use super::{ConsumptionStore, StoreError};

/// Store backed by in-process vectors. Aggregation runs through
/// [`bucketize`], which mirrors the SQL grouping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    clients: Vec<ClientRecord>,
    events: Vec<ConsumptionEvent>,
}

impl InMemoryStore {
    pub fn new(clients: Vec<ClientRecord>, events: Vec<ConsumptionEvent>) -> Self {
        Self { clients, events }
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for InMemoryStore {
    async fn clients(&self) -> Result<Vec<ClientRecord>, StoreError> {
        Ok(self.clients.clone())
    }

    async fn client(&self, owner_id: &str) -> Result<Option<ClientRecord>, StoreError> {
        Ok(self.clients.iter().find(|c| c.external_id == owner_id).cloned())
    }

    async fn neighborhoods(&self) -> Result<Vec<String>, StoreError> {
        let distinct: BTreeSet<&str> = self
            .clients
            .iter()
            .filter_map(|c| c.neighborhood.as_deref())
            .filter(|n| !n.trim().is_empty())
            .collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }

    async fn buckets(&self, query: &BucketQuery) -> Result<Vec<ConsumptionBucket>, StoreError> {
        Ok(bucketize(&self.events, query))
    }

    async fn recent_events(&self, owner_id: &str, limit: i64) -> Result<Vec<ConsumptionEvent>, StoreError> {
        let mut events: Vec<ConsumptionEvent> = self
            .events
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.ts.cmp(&a.ts));
        events.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str, neighborhood: Option<&str>) -> ClientRecord {
        ClientRecord {
            external_id: id.to_string(),
            name: None,
            street: None,
            street_number: None,
            neighborhood: neighborhood.map(str::to_string),
            city: None,
            province: None,
        }
    }

    #[tokio::test]
    async fn neighborhoods_skip_blank_values() {
        let store = InMemoryStore::new(
            vec![
                client("A001", Some("Norte")),
                client("B002", Some("   ")),
                client("C003", Some("")),
                client("D004", None),
                client("E005", Some("Centro")),
                client("F006", Some("Norte")),
            ],
            Vec::new(),
        );

        assert_eq!(store.neighborhoods().await.unwrap(), vec!["Centro", "Norte"]);
    }
}
