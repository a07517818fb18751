use std::collections::{BTreeMap, HashSet};

use time::{Date, Duration, OffsetDateTime};

use super::ConsumptionEvent;

/// Upper bound on the number of buckets a single aggregation returns.
pub const DEFAULT_BUCKET_LIMIT: i64 = 50_000;

/// Consumption of one owner summed over one (day, hour) slot.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConsumptionBucket {
    pub owner_id: String,
    pub day: Date,
    pub hour: i32,
    pub consumption: f64,
    pub generated: f64,
    pub need: f64,
    pub sample_count: i64,
}

/// Filter for a bucket aggregation.
///
/// `start` and `end` are whole UTC days, both inclusive. `owner_ids` of `None`
/// means every owner; `Some` restricts to the listed owners (an empty list
/// matches nothing).
#[derive(Debug, Clone, PartialEq)]
pub struct BucketQuery {
    pub start: Date,
    pub end: Date,
    pub owner_ids: Option<Vec<String>>,
    pub limit: i64,
}

impl BucketQuery {
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            start,
            end,
            owner_ids: None,
            limit: DEFAULT_BUCKET_LIMIT,
        }
    }

    pub fn with_owners(mut self, owner_ids: Vec<String>) -> Self {
        self.owner_ids = Some(owner_ids);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Half-open timestamp window `[start 00:00, end + 1 day 00:00)` in UTC.
    pub fn window(&self) -> (OffsetDateTime, OffsetDateTime) {
        let from = self.start.midnight().assume_utc();
        let until = self.end.midnight().assume_utc() + Duration::days(1);
        (from, until)
    }
}

#[derive(Default)]
struct Sums {
    consumption: f64,
    generated: f64,
    need: f64,
    count: i64,
}

/// In-memory equivalent of the SQL bucket aggregation.
///
/// Groups by (owner, UTC day, UTC hour), sums the energy fields, returns the
/// buckets ordered by that key and truncated to `query.limit`.
pub fn bucketize(events: &[ConsumptionEvent], query: &BucketQuery) -> Vec<ConsumptionBucket> {
    let (from, until) = query.window();
    let owners: Option<HashSet<&str>> = query
        .owner_ids
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());

    let mut groups: BTreeMap<(&str, Date, i32), Sums> = BTreeMap::new();
    for event in events {
        if event.ts < from || event.ts >= until {
            continue;
        }
        if let Some(owners) = &owners {
            if !owners.contains(event.owner_id.as_str()) {
                continue;
            }
        }

        let utc = event.ts.to_offset(time::UtcOffset::UTC);
        let sums = groups
            .entry((event.owner_id.as_str(), utc.date(), i32::from(utc.hour())))
            .or_default();
        sums.consumption += event.consumption;
        sums.generated += event.generated;
        sums.need += event.need;
        sums.count += 1;
    }

    let limit = usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX);
    groups
        .into_iter()
        .take(limit)
        .map(|((owner_id, day, hour), sums)| ConsumptionBucket {
            owner_id: owner_id.to_string(),
            day,
            hour,
            consumption: sums.consumption,
            generated: sums.generated,
            need: sums.need,
            sample_count: sums.count,
        })
        .collect()
}
