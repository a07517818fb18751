use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{BucketQuery, ConsumptionBucket, ConsumptionEvent};

/// Aggregate raw events into (owner, day, hour) buckets, ordered by that key.
///
/// Owner ids sort bytewise (`COLLATE "C"`) whatever the database collation,
/// so adjacent buckets match [`crate::domain::bucketize`].
///
/// Days and hours are taken in UTC. The result is truncated to `query.limit`
/// rows, so callers must treat it as possibly incomplete for large ranges.
pub async fn aggregate_buckets(pool: &PgPool, query: &BucketQuery) -> Result<Vec<ConsumptionBucket>> {
    let (from, until) = query.window();

    let rows = sqlx::query_as::<_, ConsumptionBucket>(
        r#"
        SELECT
            owner_id,
            (ts AT TIME ZONE 'UTC')::date                  AS day,
            EXTRACT(HOUR FROM ts AT TIME ZONE 'UTC')::int4 AS hour,
            COALESCE(SUM(consumption), 0)::float8          AS consumption,
            COALESCE(SUM(generated), 0)::float8            AS generated,
            COALESCE(SUM(need), 0)::float8                 AS need,
            COUNT(*)                                       AS sample_count
        FROM consumption_events
        WHERE ts >= $1
          AND ts <  $2
          AND ($3::text[] IS NULL OR owner_id = ANY($3))
        GROUP BY 1, 2, 3
        ORDER BY owner_id COLLATE "C", 2, 3
        LIMIT $4
        "#,
    )
    .bind(from)
    .bind(until)
    .bind(query.owner_ids.as_deref())
    .bind(query.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most recent raw events of one owner, newest first.
pub async fn recent_events(pool: &PgPool, owner_id: &str, limit: i64) -> Result<Vec<ConsumptionEvent>> {
    let rows = sqlx::query_as::<_, ConsumptionEvent>(
        r#"
        SELECT
            ts,
            owner_id,
            COALESCE(consumption, 0) AS consumption,
            COALESCE(generated, 0)   AS generated,
            COALESCE(need, 0)        AS need
        FROM consumption_events
        WHERE owner_id = $1
        ORDER BY ts DESC
        LIMIT $2
        "#,
    )
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
