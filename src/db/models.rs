use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One persisted sensor sample. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Reading {
    pub id: i64,
    /// Sensor state as reported by the device (observed: 0 or 1).
    pub value: i64,
    /// Device-side epoch milliseconds, when the device sent one.
    pub device_timestamp: Option<i64>,
    /// Free-form timestamp added by the relay between device and server.
    pub client_timestamp: Option<String>,
    pub server_timestamp: DateTime<Utc>,
}

/// Fields of a reading supplied by the writer; the store assigns the rest.
#[derive(Debug, Clone, Default)]
pub struct NewReading {
    /// `None` is passed through and rejected by the `NOT NULL` column.
    pub value: Option<i64>,
    pub device_timestamp: Option<i64>,
    pub client_timestamp: Option<String>,
}

/// Aggregate snapshot over the whole `readings` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Stats {
    pub total_count: i64,
    pub count_ones: i64,
    pub count_zeros: i64,
    pub last_update: Option<DateTime<Utc>>,
}
