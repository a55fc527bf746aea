use sqlx::PgPool;

use super::models::{NewReading, Reading, Stats};
use crate::error::PersistenceError;

/// `limit` used when the caller gives none, or a non-positive one.
pub const DEFAULT_RECENT_LIMIT: i64 = 100;

/// Pooled access to the `readings` table.
///
/// Cloning is cheap: clones share the same `PgPool`. Callers beyond the
/// pool's `max_connections` queue until a connection frees up.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `readings` table and its recency index if absent.
    /// Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id               BIGSERIAL   PRIMARY KEY,
                value            BIGINT      NOT NULL,
                device_timestamp BIGINT,
                client_timestamp TEXT,
                server_timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS readings_server_timestamp_idx \
             ON readings (server_timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist one reading and return the id the datastore assigned.
    pub async fn insert(&self, reading: &NewReading) -> Result<i64, PersistenceError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO readings (value, device_timestamp, client_timestamp)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(reading.value)
        .bind(reading.device_timestamp)
        .bind(reading.client_timestamp.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Up to `limit` readings, newest (highest id) first. A non-positive
    /// `limit` falls back to `DEFAULT_RECENT_LIMIT`.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Reading>, PersistenceError> {
        let limit = if limit > 0 { limit } else { DEFAULT_RECENT_LIMIT };

        let rows = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, value, device_timestamp, client_timestamp, server_timestamp
            FROM readings
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts over the whole table, computed on every call. Values other
    /// than 0 and 1 only contribute to `total_count`.
    pub async fn stats(&self) -> Result<Stats, PersistenceError> {
        let stats = sqlx::query_as::<_, Stats>(
            r#"
            SELECT COUNT(*)                             AS total_count,
                   COUNT(*) FILTER (WHERE value = 1)    AS count_ones,
                   COUNT(*) FILTER (WHERE value = 0)    AS count_zeros,
                   MAX(server_timestamp)                AS last_update
            FROM readings
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
