use chrono::Utc;
use tracing::{debug, error};

use crate::{
    broadcaster::Broadcaster,
    db::{
        models::{NewReading, Reading},
        Store,
    },
    error::PersistenceError,
};

/// Write path: persist a reading, then announce it to live subscribers.
#[derive(Debug, Clone)]
pub struct IngestService {
    store: Store,
    broadcaster: Broadcaster,
}

impl IngestService {
    pub fn new(store: Store, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Inserts `new`, publishes the stored reading and returns it.
    ///
    /// `value` is not range-checked; whatever the datastore accepts is
    /// stored. Nothing is published or retried when the insert fails.
    /// The published `server_timestamp` is taken here, after the insert,
    /// rather than read back from the row.
    pub async fn ingest(&self, new: NewReading) -> Result<Reading, PersistenceError> {
        let id = match self.store.insert(&new).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, value = ?new.value, "Failed to persist reading");
                return Err(e);
            }
        };

        let reading = Reading {
            id,
            // The column is NOT NULL, so a successful insert had a value.
            value: new.value.unwrap_or_default(),
            device_timestamp: new.device_timestamp,
            client_timestamp: new.client_timestamp,
            server_timestamp: Utc::now(),
        };

        debug!(id, value = reading.value, "Reading persisted");
        self.broadcaster.publish(reading.clone());
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    async fn service(pool: PgPool) -> (IngestService, Broadcaster) {
        let store = Store::new(pool);
        store.ensure_schema().await.unwrap();
        let broadcaster = Broadcaster::new(16);
        (IngestService::new(store, broadcaster.clone()), broadcaster)
    }

    #[sqlx::test(migrations = false)]
    async fn ingest_publishes_persisted_reading(pool: PgPool) {
        let (service, broadcaster) = service(pool).await;
        let mut rx = broadcaster.subscribe();

        let reading = service
            .ingest(NewReading {
                value: Some(1),
                device_timestamp: Some(1000),
                client_timestamp: Some("12:00:00".to_owned()),
            })
            .await
            .unwrap();

        let published = rx.recv().await.unwrap();
        assert_eq!(published, reading);
        assert_eq!(published.device_timestamp, Some(1000));
    }

    #[sqlx::test(migrations = false)]
    async fn failed_ingest_publishes_nothing(pool: PgPool) {
        let (service, broadcaster) = service(pool).await;
        let mut rx = broadcaster.subscribe();

        assert!(service.ingest(NewReading::default()).await.is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
