//! Joins aggregated buckets with the client directory.
//!
//! The directory is a read-only snapshot built once per request. Owners that
//! are missing from it resolve to sentinel values instead of failing.

use std::collections::HashMap;

use consumption_client::domain::{ClientRecord, ConsumptionBucket};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Address and neighborhood of owners absent from the directory.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub owner_id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

impl From<ClientRecord> for DirectoryEntry {
    fn from(c: ClientRecord) -> Self {
        let address = c.address();
        DirectoryEntry {
            owner_id: c.external_id,
            name: c.name,
            address,
            neighborhood: c.neighborhood.filter(|n| !n.trim().is_empty()),
            city: c.city,
            province: c.province,
        }
    }
}

/// Owner id → directory entry.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: HashMap<String, DirectoryEntry>,
}

impl Directory {
    /// Later rows win when an owner id appears twice.
    pub fn from_clients(clients: impl IntoIterator<Item = ClientRecord>) -> Self {
        let entries = clients
            .into_iter()
            .map(|c| {
                let entry = DirectoryEntry::from(c);
                (entry.owner_id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, owner_id: &str) -> Option<&DirectoryEntry> {
        self.entries.get(owner_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted ids of the owners registered in `neighborhood`.
    pub fn owners_in(&self, neighborhood: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.neighborhood.as_deref() == Some(neighborhood))
            .map(|e| e.owner_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// A bucket with the location fields of its owner resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBucket {
    pub bucket: ConsumptionBucket,
    /// Start of the bucket's hour, UTC.
    pub timestamp: OffsetDateTime,
    pub address: String,
    pub neighborhood: String,
    pub city: String,
    pub province: String,
}

pub fn enrich(bucket: ConsumptionBucket, directory: &Directory) -> EnrichedBucket {
    let entry = directory.get(&bucket.owner_id);
    let resolve = |value: Option<&String>, fallback: &str| {
        value.cloned().unwrap_or_else(|| fallback.to_string())
    };

    EnrichedBucket {
        timestamp: slot_start(bucket.day, bucket.hour),
        address: resolve(entry.and_then(|e| e.address.as_ref()), UNKNOWN),
        neighborhood: resolve(entry.and_then(|e| e.neighborhood.as_ref()), UNKNOWN),
        city: resolve(entry.and_then(|e| e.city.as_ref()), ""),
        province: resolve(entry.and_then(|e| e.province.as_ref()), ""),
        bucket,
    }
}

pub fn enrich_all(buckets: Vec<ConsumptionBucket>, directory: &Directory) -> Vec<EnrichedBucket> {
    buckets.into_iter().map(|b| enrich(b, directory)).collect()
}

fn slot_start(day: Date, hour: i32) -> OffsetDateTime {
    let time = u8::try_from(hour)
        .ok()
        .and_then(|h| Time::from_hms(h, 0, 0).ok())
        .unwrap_or(Time::MIDNIGHT);
    PrimitiveDateTime::new(day, time).assume_utc()
}
