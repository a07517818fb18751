//! Threshold rules over the ordered sequence of enriched buckets.
//!
//! Each bucket is checked against the nocturnal-spike and low-need rules on
//! its own; the sudden-increase rule also looks at the bucket just before it.
//! Output preserves input order, and within one bucket the rules fire in the
//! order listed on [`AnomalyKind`].

use std::ops::Range;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::enrich::EnrichedBucket;

/// Hours of the day (UTC) considered nocturnal.
pub const NIGHT_HOURS: Range<i32> = 0..6;
pub const NOCTURNAL_MIN_KWH: f64 = 15.0;
pub const NOCTURNAL_HIGH_KWH: f64 = 25.0;
pub const LOW_NEED_MAX_KWH: f64 = 0.5;
pub const LOW_NEED_MIN_CONSUMPTION_KWH: f64 = 20.0;
pub const SUDDEN_INCREASE_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AnomalyKind {
    NocturnalSpike,
    HighConsumptionLowNeed,
    SuddenIncrease,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NocturnalSpike => "NocturnalSpike",
            Self::HighConsumptionLowNeed => "HighConsumptionLowNeed",
            Self::SuddenIncrease => "SuddenIncrease",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub owner_id: String,
    pub address: String,
    pub neighborhood: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub kind: AnomalyKind,
    /// Consumption of the flagged bucket, kWh.
    pub value: f64,
    pub risk_level: RiskLevel,
    pub score: u8,
    pub description: String,
}

impl Anomaly {
    fn for_bucket(b: &EnrichedBucket, kind: AnomalyKind, risk_level: RiskLevel, score: u8, description: String) -> Self {
        Self {
            owner_id: b.bucket.owner_id.clone(),
            address: b.address.clone(),
            neighborhood: b.neighborhood.clone(),
            timestamp: b.timestamp,
            kind,
            value: b.bucket.consumption,
            risk_level,
            score,
            description,
        }
    }
}

/// Which bucket counts as "previous" for the sudden-increase rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuddenIncreaseScope {
    /// The index-adjacent bucket, even when it belongs to another owner.
    #[default]
    Sequence,
    /// The index-adjacent bucket only when it belongs to the same owner.
    Owner,
}

impl SuddenIncreaseScope {
    fn pairs(&self, previous: &EnrichedBucket, current: &EnrichedBucket) -> bool {
        match self {
            Self::Sequence => true,
            Self::Owner => previous.bucket.owner_id == current.bucket.owner_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    scope: SuddenIncreaseScope,
}

impl Evaluator {
    pub fn new(scope: SuddenIncreaseScope) -> Self {
        Self { scope }
    }

    /// Runs every rule over `buckets`, which must be ordered by
    /// (owner, day, hour).
    pub fn evaluate(&self, buckets: &[EnrichedBucket]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        let mut previous: Option<&EnrichedBucket> = None;

        for current in buckets {
            anomalies.extend(nocturnal_spike(current));
            anomalies.extend(high_consumption_low_need(current));
            if let Some(prev) = previous.filter(|p| self.scope.pairs(p, current)) {
                anomalies.extend(sudden_increase(prev, current));
            }
            previous = Some(current);
        }

        anomalies
    }
}

pub fn nocturnal_spike(b: &EnrichedBucket) -> Option<Anomaly> {
    let consumption = b.bucket.consumption;
    if !NIGHT_HOURS.contains(&b.bucket.hour) || consumption <= NOCTURNAL_MIN_KWH {
        return None;
    }

    let (risk, score) = if consumption > NOCTURNAL_HIGH_KWH {
        (RiskLevel::High, 85)
    } else {
        (RiskLevel::Medium, 65)
    };
    let description = format!(
        "Consumption of {consumption} kWh during night hours ({}:00h)",
        b.bucket.hour
    );
    Some(Anomaly::for_bucket(b, AnomalyKind::NocturnalSpike, risk, score, description))
}

/// Consumption far above declared need hints at unreported generation.
pub fn high_consumption_low_need(b: &EnrichedBucket) -> Option<Anomaly> {
    let consumption = b.bucket.consumption;
    let need = b.bucket.need;
    if need >= LOW_NEED_MAX_KWH || consumption <= LOW_NEED_MIN_CONSUMPTION_KWH {
        return None;
    }

    let description = format!("Consumption of {consumption} kWh but need only {need} kWh");
    Some(Anomaly::for_bucket(
        b,
        AnomalyKind::HighConsumptionLowNeed,
        RiskLevel::High,
        90,
        description,
    ))
}

/// Never fires when the previous consumption is zero or negative.
pub fn sudden_increase(previous: &EnrichedBucket, current: &EnrichedBucket) -> Option<Anomaly> {
    let prev = previous.bucket.consumption;
    let curr = current.bucket.consumption;
    if prev <= 0.0 || curr <= prev * SUDDEN_INCREASE_FACTOR {
        return None;
    }

    let pct = increase_percent(prev, curr);
    let description = format!("Increase of {pct}% over the previous reading");
    Some(Anomaly::for_bucket(
        current,
        AnomalyKind::SuddenIncrease,
        RiskLevel::Medium,
        70,
        description,
    ))
}

/// `round((curr / prev - 1) * 100)`; `prev` must be positive.
pub fn increase_percent(prev: f64, curr: f64) -> i64 {
    ((curr / prev - 1.0) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_client::domain::ConsumptionBucket;
    use time::macros::{date, datetime};

    fn enriched(owner: &str, hour: i32, consumption: f64, need: f64) -> EnrichedBucket {
        EnrichedBucket {
            bucket: ConsumptionBucket {
                owner_id: owner.to_string(),
                day: date!(2022 - 02 - 01),
                hour,
                consumption,
                generated: 0.0,
                need,
                sample_count: 1,
            },
            timestamp: datetime!(2022-02-01 00:00:00 UTC) + time::Duration::hours(i64::from(hour)),
            address: "Calle Luna 7".to_string(),
            neighborhood: "Triana".to_string(),
            city: String::new(),
            province: String::new(),
        }
    }

    fn kinds(anomalies: &[Anomaly]) -> Vec<AnomalyKind> {
        anomalies.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn nocturnal_spike_scores_by_consumption() {
        let medium = nocturnal_spike(&enriched("A001", 2, 20.0, 5.0)).unwrap();
        assert_eq!(medium.score, 65);
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.description, "Consumption of 20 kWh during night hours (2:00h)");

        let high = nocturnal_spike(&enriched("A001", 5, 25.5, 5.0)).unwrap();
        assert_eq!(high.score, 85);
        assert_eq!(high.risk_level, RiskLevel::High);
    }

    #[test]
    fn nocturnal_spike_respects_bounds() {
        assert!(nocturnal_spike(&enriched("A001", 6, 40.0, 5.0)).is_none());
        assert!(nocturnal_spike(&enriched("A001", 0, 15.0, 5.0)).is_none());
        assert!(nocturnal_spike(&enriched("A001", 0, 15.1, 5.0)).is_some());
        // Exactly 25 stays medium.
        assert_eq!(nocturnal_spike(&enriched("A001", 1, 25.0, 5.0)).unwrap().score, 65);
    }

    #[test]
    fn low_need_fires_regardless_of_hour() {
        let a = high_consumption_low_need(&enriched("A001", 14, 25.0, 0.2)).unwrap();
        assert_eq!(a.score, 90);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.description, "Consumption of 25 kWh but need only 0.2 kWh");

        assert!(high_consumption_low_need(&enriched("A001", 14, 25.0, 0.5)).is_none());
        assert!(high_consumption_low_need(&enriched("A001", 14, 20.0, 0.1)).is_none());
    }

    #[test]
    fn sudden_increase_reports_rounded_percentage() {
        let a = sudden_increase(&enriched("A001", 8, 10.0, 5.0), &enriched("A001", 9, 35.0, 5.0)).unwrap();
        assert_eq!(a.score, 70);
        assert_eq!(a.risk_level, RiskLevel::Medium);
        assert_eq!(a.value, 35.0);
        assert_eq!(a.description, "Increase of 250% over the previous reading");

        assert_eq!(increase_percent(3.0, 10.0), 233);
    }

    #[test]
    fn sudden_increase_needs_positive_previous_and_strict_factor() {
        assert!(sudden_increase(&enriched("A001", 8, 0.0, 5.0), &enriched("A001", 9, 35.0, 5.0)).is_none());
        assert!(sudden_increase(&enriched("A001", 8, 10.0, 5.0), &enriched("A001", 9, 30.0, 5.0)).is_none());
    }

    #[test]
    fn night_sequence_example() {
        let buckets = vec![enriched("A001", 2, 20.0, 5.0), enriched("A001", 3, 5.0, 5.0)];
        let anomalies = Evaluator::default().evaluate(&buckets);

        assert_eq!(kinds(&anomalies), vec![AnomalyKind::NocturnalSpike]);
        assert_eq!(anomalies[0].score, 65);
    }

    #[test]
    fn all_rules_fire_in_order_for_one_bucket() {
        let buckets = vec![enriched("A001", 1, 5.0, 5.0), enriched("A001", 2, 30.0, 0.1)];
        let anomalies = Evaluator::default().evaluate(&buckets);

        assert_eq!(
            kinds(&anomalies),
            vec![
                AnomalyKind::NocturnalSpike,
                AnomalyKind::HighConsumptionLowNeed,
                AnomalyKind::SuddenIncrease,
            ]
        );
        assert!(anomalies.iter().all(|a| a.timestamp == datetime!(2022-02-01 02:00:00 UTC)));
    }

    #[test]
    fn scope_decides_comparison_across_owner_seam() {
        let buckets = vec![enriched("A001", 12, 2.0, 5.0), enriched("B002", 12, 10.0, 5.0)];

        let flat = Evaluator::new(SuddenIncreaseScope::Sequence).evaluate(&buckets);
        assert_eq!(kinds(&flat), vec![AnomalyKind::SuddenIncrease]);
        assert_eq!(flat[0].owner_id, "B002");

        let per_owner = Evaluator::new(SuddenIncreaseScope::Owner).evaluate(&buckets);
        assert!(per_owner.is_empty());
    }
}
