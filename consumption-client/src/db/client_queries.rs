use anyhow::Result;
use sqlx::PgPool;

use crate::domain::ClientRecord;

const CLIENT_COLUMNS: &str = "external_id, name, street, street_number, neighborhood, city, province";

/// Full snapshot of the client directory.
pub async fn load_clients(pool: &PgPool) -> Result<Vec<ClientRecord>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY external_id");
    let rows = sqlx::query_as::<_, ClientRecord>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_client(pool: &PgPool, external_id: &str) -> Result<Option<ClientRecord>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE external_id = $1");
    let row = sqlx::query_as::<_, ClientRecord>(&sql)
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Distinct neighborhoods that are not blank, sorted.
pub async fn distinct_neighborhoods(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT neighborhood
        FROM clients
        WHERE neighborhood IS NOT NULL
          AND btrim(neighborhood) <> ''
        ORDER BY neighborhood
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
