use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{NewReading, Reading, Stats};

/// Name of the live event pushed for every stored reading.
pub const NEW_DATA_EVENT: &str = "newData";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    pub id: i64,
    pub value: i64,
    /// Device-side epoch milliseconds.
    pub arduino_timestamp: Option<i64>,
    /// Timestamp added by the relaying PC, verbatim.
    pub pc_timestamp: Option<String>,
    pub server_timestamp: DateTime<Utc>,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            value: r.value,
            arduino_timestamp: r.device_timestamp,
            pc_timestamp: r.client_timestamp,
            server_timestamp: r.server_timestamp,
        }
    }
}

/// Request body for `POST /api/data`.
///
/// `value` is optional here so a body without it reaches the store, which
/// rejects it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReadingRequest {
    pub value: Option<i64>,
    /// Device-side epoch milliseconds.
    pub timestamp: Option<i64>,
    pub pc_timestamp: Option<String>,
}

impl From<CreateReadingRequest> for NewReading {
    fn from(r: CreateReadingRequest) -> Self {
        Self {
            value: r.value,
            device_timestamp: r.timestamp,
            client_timestamp: r.pc_timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReadingResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsDto {
    pub total_records: i64,
    pub count_ones: i64,
    pub count_zeros: i64,
    /// Server timestamp of the newest reading; `null` when there are none.
    pub last_update: Option<DateTime<Utc>>,
}

impl From<Stats> for StatsDto {
    fn from(s: Stats) -> Self {
        Self {
            total_records: s.total_count,
            count_ones: s.count_ones,
            count_zeros: s.count_zeros,
            last_update: s.last_update,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Text frame sent to live subscribers.
#[derive(Debug, Serialize)]
pub struct LiveEvent {
    pub event: String,
    pub data: ReadingDto,
}

impl LiveEvent {
    pub fn new_data(reading: Reading) -> Self {
        Self {
            event: NEW_DATA_EVENT.to_owned(),
            data: reading.into(),
        }
    }
}
