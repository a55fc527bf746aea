pub mod models;
mod store;

use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, PgConnection,
};
use tracing::info;

use crate::{config::Config, error::StartupError};

pub use store::{Store, DEFAULT_RECENT_LIMIT};

/// Make the datastore ready: create the database if missing, open the
/// pool, then create the table and index. Must finish before the HTTP
/// listener binds.
pub async fn bootstrap(config: &Config) -> Result<Store, StartupError> {
    let pool_options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs));

    bootstrap_with(
        &config.maintenance_options(),
        config.connect_options(),
        &config.db_name,
        pool_options,
    )
    .await
}

async fn bootstrap_with(
    maintenance: &PgConnectOptions,
    target: PgConnectOptions,
    db_name: &str,
    pool_options: PgPoolOptions,
) -> Result<Store, StartupError> {
    ensure_database(maintenance, db_name).await?;

    let pool = pool_options
        .connect_with(target)
        .await
        .map_err(StartupError::Connect)?;

    let store = Store::new(pool);
    store
        .ensure_schema()
        .await
        .map_err(|e| StartupError::CreateSchema(e.0))?;

    info!(database = %db_name, "Database ready");
    Ok(store)
}

async fn ensure_database(maintenance: &PgConnectOptions, db_name: &str) -> Result<(), StartupError> {
    let mut conn = PgConnection::connect_with(maintenance)
        .await
        .map_err(StartupError::Connect)?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&mut conn)
            .await
            .map_err(StartupError::CreateDatabase)?;

    if !exists {
        // CREATE DATABASE takes no bind parameters.
        let statement = format!("CREATE DATABASE {}", quote_identifier(db_name));
        sqlx::query(&statement)
            .execute(&mut conn)
            .await
            .map_err(StartupError::CreateDatabase)?;
        info!(database = %db_name, "Created database");
    }

    conn.close().await.map_err(StartupError::Connect)?;
    Ok(())
}

/// Quote a Postgres identifier, doubling any embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::db::models::NewReading;

    /// Server named by `DATABASE_URL`, the same one `#[sqlx::test]` uses.
    fn test_server_options() -> PgConnectOptions {
        std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for database tests")
            .parse()
            .unwrap()
    }

    async fn drop_database(server: &PgConnectOptions, db_name: &str) {
        let mut conn = PgConnection::connect_with(&server.clone().database("postgres"))
            .await
            .unwrap();
        let statement = format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", quote_identifier(db_name));
        sqlx::query(&statement).execute(&mut conn).await.unwrap();
    }

    #[test]
    fn quote_identifier_wraps_plain_names() {
        assert_eq!(quote_identifier("sensor_feed"), "\"sensor_feed\"");
    }

    #[test]
    fn quote_identifier_escapes_embedded_quotes() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn bootstrap_creates_database_then_reuses_it() {
        let server = test_server_options();
        let maintenance = server.clone().database("postgres");
        let db_name = format!("bootstrap_{}\"db", Uuid::new_v4().simple());
        let target = server.clone().database(&db_name);

        let first = bootstrap_with(&maintenance, target.clone(), &db_name, PgPoolOptions::new())
            .await
            .unwrap();
        let id = first
            .insert(&NewReading {
                value: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        drop(first);

        // A restart against the existing database keeps earlier rows.
        let second = bootstrap_with(&maintenance, target, &db_name, PgPoolOptions::new())
            .await
            .unwrap();
        let rows = second.list_recent(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        drop(second);

        drop_database(&server, &db_name).await;
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connect_error() {
        let server = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("postgres");

        let err = bootstrap_with(
            &server.clone().database("postgres"),
            server.database("sensor_feed"),
            "sensor_feed",
            PgPoolOptions::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StartupError::Connect(_)));
    }
}
