use sqlx::postgres::PgConnectOptions;

use crate::error::StartupError;

/// Database the bootstrap step connects to while checking for `DB_NAME`.
const MAINTENANCE_DB: &str = "postgres";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// Upper bound of the connection pool.
    pub db_max_connections: u32,
    /// How long a request queues for a free pooled connection.
    pub db_acquire_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    /// Cap applied to `?limit=` on the recent-readings endpoint.
    pub recent_limit_max: i64,
    /// Live events buffered per subscriber before it starts skipping.
    pub broadcast_capacity: usize,
    /// Browser origins allowed by CORS. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            db_host: optional("DB_HOST", "localhost"),
            db_port: parsed(&optional("DB_PORT", "5432"), "DB_PORT")?,
            db_user: optional("DB_USER", "postgres"),
            db_password: optional("DB_PASSWORD", ""),
            db_name: optional("DB_NAME", "sensor_feed"),
            db_max_connections: parsed(&optional("DB_MAX_CONNECTIONS", "10"), "DB_MAX_CONNECTIONS")?,
            db_acquire_timeout_secs: parsed(
                &optional("DB_ACQUIRE_TIMEOUT_SECS", "30"),
                "DB_ACQUIRE_TIMEOUT_SECS",
            )?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: parsed(&optional("PORT", "3000"), "PORT")?,
            recent_limit_max: parsed(&optional("RECENT_LIMIT_MAX", "1000"), "RECENT_LIMIT_MAX")?,
            broadcast_capacity: parsed(&optional("BROADCAST_CAPACITY", "256"), "BROADCAST_CAPACITY")?,
            cors_origins: parse_list(&optional("CORS_ORIGINS", "")),
        })
    }

    /// Connection options for the service database.
    pub fn connect_options(&self) -> PgConnectOptions {
        self.server_options().database(&self.db_name)
    }

    /// Connection options for the maintenance database, used to create
    /// `db_name` when it does not exist yet.
    pub fn maintenance_options(&self) -> PgConnectOptions {
        self.server_options().database(MAINTENANCE_DB)
    }

    fn server_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_password)
    }
}

fn parsed<T>(raw: &str, key: &'static str) -> Result<T, StartupError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| StartupError::Config {
        key,
        message: format!("{raw:?} is not valid: {e}"),
    })
}

/// Parse `"a,b , c"` into `["a", "b", "c"]`, skipping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, StartupError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let c = config_from(&[]).unwrap();
        assert_eq!(c.db_host, "localhost");
        assert_eq!(c.db_port, 5432);
        assert_eq!(c.db_user, "postgres");
        assert_eq!(c.db_password, "");
        assert_eq!(c.db_name, "sensor_feed");
        assert_eq!(c.db_max_connections, 10);
        assert_eq!(c.server_port, 3000);
        assert_eq!(c.recent_limit_max, 1000);
        assert!(c.cors_origins.is_empty());
    }

    #[test]
    fn overrides_are_read() {
        let c = config_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "arduino"),
            ("PORT", "8080"),
            ("DB_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(c.db_host, "db.internal");
        assert_eq!(c.db_port, 6543);
        assert_eq!(c.db_name, "arduino");
        assert_eq!(c.server_port, 8080);
        assert_eq!(c.db_max_connections, 4);
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let c = config_from(&[("CORS_ORIGINS", "http://a.test, http://b.test,,")]).unwrap();
        assert_eq!(c.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn connect_options_target_configured_database() {
        let c = config_from(&[("DB_NAME", "arduino")]).unwrap();
        assert_eq!(c.connect_options().get_database(), Some("arduino"));
        assert_eq!(c.maintenance_options().get_database(), Some("postgres"));
    }
}
