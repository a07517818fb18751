use serde::Serialize;
use time::OffsetDateTime;

/// One raw reading as stored in `consumption_events`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub owner_id: String,
    pub consumption: f64,
    pub generated: f64,
    pub need: f64,
}
