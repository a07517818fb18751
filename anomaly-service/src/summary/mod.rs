//! Derived views over the enriched buckets and the anomaly list.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::Date;

use crate::detect::{Anomaly, AnomalyKind, RiskLevel};
use crate::enrich::EnrichedBucket;

/// Average score above which a location is rated high risk.
pub const HIGH_RISK_AVERAGE_SCORE: u32 = 80;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
}

impl RiskCounts {
    fn record(&mut self, risk: RiskLevel) {
        self.total += 1;
        match risk {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodStat {
    pub neighborhood: String,
    /// Mean bucket consumption in kWh, two decimals.
    pub average_consumption: String,
    pub anomaly_count: usize,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressLeaderboardEntry {
    pub owner_id: String,
    pub address: String,
    pub neighborhood: String,
    pub alert_count: usize,
    pub total_score: u32,
    pub average_score: u32,
    pub risk_level: RiskLevel,
    pub distinct_kinds_triggered: Vec<AnomalyKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub total_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub high_alerts: usize,
    pub medium_alerts: usize,
}

pub fn summarize(anomalies: &[Anomaly]) -> AnomalySummary {
    let mut counts = RiskCounts::default();
    for a in anomalies {
        counts.record(a.risk_level);
    }
    AnomalySummary {
        total_anomalies: counts.total,
        high_alerts: counts.high,
        medium_alerts: counts.medium,
    }
}

/// Per-neighborhood averages and anomaly counts, in first-seen order of the
/// buckets. Anomalies from neighborhoods without buckets are ignored.
pub fn neighborhood_stats(buckets: &[EnrichedBucket], anomalies: &[Anomaly]) -> Vec<NeighborhoodStat> {
    struct Acc<'a> {
        neighborhood: &'a str,
        total_consumption: f64,
        buckets: usize,
        risks: RiskCounts,
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Acc<'_>> = Vec::new();

    for b in buckets {
        let slot = *index.entry(b.neighborhood.as_str()).or_insert_with(|| {
            groups.push(Acc {
                neighborhood: &b.neighborhood,
                total_consumption: 0.0,
                buckets: 0,
                risks: RiskCounts::default(),
            });
            groups.len() - 1
        });
        groups[slot].total_consumption += b.bucket.consumption;
        groups[slot].buckets += 1;
    }

    for a in anomalies {
        if let Some(&slot) = index.get(a.neighborhood.as_str()) {
            groups[slot].risks.record(a.risk_level);
        }
    }

    groups
        .into_iter()
        .map(|g| NeighborhoodStat {
            neighborhood: g.neighborhood.to_string(),
            average_consumption: format!("{:.2}", g.total_consumption / g.buckets as f64),
            anomaly_count: g.risks.total,
            high_risk_count: g.risks.high,
            medium_risk_count: g.risks.medium,
        })
        .collect()
}

/// Locations ranked by total score, descending, keeping at most `limit`.
///
/// Locations are keyed by (address, neighborhood). Equal totals keep the
/// order in which the locations first appeared.
pub fn address_leaderboard(anomalies: &[Anomaly], limit: usize) -> Vec<AddressLeaderboardEntry> {
    struct Acc<'a> {
        first: &'a Anomaly,
        alerts: usize,
        total_score: u32,
        kinds: Vec<AnomalyKind>,
    }

    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<Acc<'_>> = Vec::new();

    for a in anomalies {
        let key = (a.address.as_str(), a.neighborhood.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Acc {
                first: a,
                alerts: 0,
                total_score: 0,
                kinds: Vec::new(),
            });
            groups.len() - 1
        });

        let acc = &mut groups[slot];
        acc.alerts += 1;
        acc.total_score += u32::from(a.score);
        if !acc.kinds.contains(&a.kind) {
            acc.kinds.push(a.kind);
        }
    }

    let mut entries: Vec<AddressLeaderboardEntry> = groups
        .into_iter()
        .map(|g| {
            let average_score = (f64::from(g.total_score) / g.alerts as f64).round() as u32;
            let risk_level = if average_score > HIGH_RISK_AVERAGE_SCORE {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };
            AddressLeaderboardEntry {
                owner_id: g.first.owner_id.clone(),
                address: g.first.address.clone(),
                neighborhood: g.first.neighborhood.clone(),
                alert_count: g.alerts,
                total_score: g.total_score,
                average_score,
                risk_level,
                distinct_kinds_triggered: g.kinds,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    entries.truncate(limit);
    entries
}

/// Anomaly counts per UTC calendar day, ascending, one entry per day.
pub fn timeline(anomalies: &[Anomaly]) -> Vec<TimelineEntry> {
    let mut days: BTreeMap<Date, RiskCounts> = BTreeMap::new();
    for a in anomalies {
        days.entry(a.timestamp.date()).or_default().record(a.risk_level);
    }

    days.into_iter()
        .map(|(date, counts)| TimelineEntry {
            date,
            total_count: counts.total,
            high_count: counts.high,
            medium_count: counts.medium,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_client::domain::ConsumptionBucket;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    fn bucket(neighborhood: &str, consumption: f64) -> EnrichedBucket {
        EnrichedBucket {
            bucket: ConsumptionBucket {
                owner_id: "A001".to_string(),
                day: date!(2022 - 01 - 01),
                hour: 0,
                consumption,
                generated: 0.0,
                need: 1.0,
                sample_count: 1,
            },
            timestamp: datetime!(2022-01-01 00:00:00 UTC),
            address: "Calle Luna 7".to_string(),
            neighborhood: neighborhood.to_string(),
            city: String::new(),
            province: String::new(),
        }
    }

    fn anomaly(address: &str, neighborhood: &str, kind: AnomalyKind, score: u8, ts: OffsetDateTime) -> Anomaly {
        Anomaly {
            owner_id: format!("owner-{address}"),
            address: address.to_string(),
            neighborhood: neighborhood.to_string(),
            timestamp: ts,
            kind,
            value: 30.0,
            risk_level: if score >= 85 { RiskLevel::High } else { RiskLevel::Medium },
            score,
            description: String::new(),
        }
    }

    #[test]
    fn neighborhood_stats_average_and_overlay_counts() {
        let buckets = vec![bucket("Triana", 10.0), bucket("Centro", 1.0), bucket("Triana", 5.0)];
        let ts = datetime!(2022-01-01 03:00:00 UTC);
        let anomalies = vec![
            anomaly("a", "Triana", AnomalyKind::NocturnalSpike, 85, ts),
            anomaly("a", "Triana", AnomalyKind::SuddenIncrease, 70, ts),
            anomaly("x", "Elsewhere", AnomalyKind::SuddenIncrease, 70, ts),
        ];

        let stats = neighborhood_stats(&buckets, &anomalies);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].neighborhood, "Triana");
        assert_eq!(stats[0].average_consumption, "7.50");
        assert_eq!(stats[0].anomaly_count, 2);
        assert_eq!(stats[0].high_risk_count, 1);
        assert_eq!(stats[0].medium_risk_count, 1);
        assert_eq!(stats[1].neighborhood, "Centro");
        assert_eq!(stats[1].average_consumption, "1.00");
        assert_eq!(stats[1].anomaly_count, 0);
    }

    #[test]
    fn leaderboard_groups_by_address_and_neighborhood() {
        let ts = datetime!(2022-01-01 03:00:00 UTC);
        let anomalies = vec![
            anomaly("Calle Sol 1", "Triana", AnomalyKind::NocturnalSpike, 65, ts),
            anomaly("Calle Sol 1", "Centro", AnomalyKind::HighConsumptionLowNeed, 90, ts),
            anomaly("Calle Sol 1", "Triana", AnomalyKind::SuddenIncrease, 70, ts),
            anomaly("Calle Sol 1", "Triana", AnomalyKind::NocturnalSpike, 65, ts),
        ];

        let board = address_leaderboard(&anomalies, 50);
        assert_eq!(board.len(), 2);

        let first = &board[0];
        assert_eq!(first.neighborhood, "Triana");
        assert_eq!(first.alert_count, 3);
        assert_eq!(first.total_score, 200);
        assert_eq!(first.average_score, 67);
        assert_eq!(first.risk_level, RiskLevel::Medium);
        assert_eq!(
            first.distinct_kinds_triggered,
            vec![AnomalyKind::NocturnalSpike, AnomalyKind::SuddenIncrease]
        );

        assert_eq!(board[1].total_score, 90);
        assert_eq!(board[1].risk_level, RiskLevel::High);
    }

    #[test]
    fn leaderboard_is_sorted_and_truncated() {
        let ts = datetime!(2022-01-01 03:00:00 UTC);
        let anomalies: Vec<Anomaly> = (0..60u8)
            .map(|i| anomaly(&format!("addr {i}"), "Triana", AnomalyKind::SuddenIncrease, 40 + i, ts))
            .collect();

        let board = address_leaderboard(&anomalies, 50);
        assert_eq!(board.len(), 50);
        assert_eq!(board[0].total_score, 99);
        assert!(board.windows(2).all(|w| w[0].total_score >= w[1].total_score));
    }

    #[test]
    fn leaderboard_risk_uses_rounded_average() {
        let ts = datetime!(2022-01-01 03:00:00 UTC);
        // (85 + 85 + 70) / 3 = 80 exactly: medium.
        let anomalies = vec![
            anomaly("a", "Triana", AnomalyKind::NocturnalSpike, 85, ts),
            anomaly("a", "Triana", AnomalyKind::NocturnalSpike, 85, ts),
            anomaly("a", "Triana", AnomalyKind::SuddenIncrease, 70, ts),
        ];
        let board = address_leaderboard(&anomalies, 50);
        assert_eq!(board[0].average_score, 80);
        assert_eq!(board[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn timeline_is_ascending_without_duplicates() {
        let anomalies = vec![
            anomaly("a", "T", AnomalyKind::NocturnalSpike, 85, datetime!(2022-03-02 01:00:00 UTC)),
            anomaly("a", "T", AnomalyKind::SuddenIncrease, 70, datetime!(2022-03-01 23:00:00 UTC)),
            anomaly("b", "T", AnomalyKind::NocturnalSpike, 65, datetime!(2022-03-02 04:00:00 UTC)),
        ];

        let days = timeline(&anomalies);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date!(2022 - 03 - 01));
        assert_eq!(days[0].total_count, 1);
        assert_eq!(days[1].date, date!(2022 - 03 - 02));
        assert_eq!(days[1].total_count, 2);
        assert_eq!(days[1].high_count, 1);
        assert_eq!(days[1].medium_count, 1);

        let json = serde_json::to_value(&days[0]).unwrap();
        assert_eq!(json["date"], "2022-03-01");
        assert_eq!(json["totalCount"], 1);
    }

    #[test]
    fn summary_counts_by_risk() {
        let ts = datetime!(2022-01-01 03:00:00 UTC);
        let anomalies = vec![
            anomaly("a", "T", AnomalyKind::NocturnalSpike, 85, ts),
            anomaly("a", "T", AnomalyKind::SuddenIncrease, 70, ts),
            anomaly("a", "T", AnomalyKind::HighConsumptionLowNeed, 90, ts),
        ];
        assert_eq!(
            summarize(&anomalies),
            AnomalySummary {
                total_anomalies: 3,
                high_alerts: 2,
                medium_alerts: 1,
            }
        );
    }
}
