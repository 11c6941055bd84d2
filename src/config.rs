use anyhow::{ensure, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite URL, e.g. `sqlite://plant_data.db`. The file is created if missing.
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_host: String,
    /// Defaults to 5001 so it does not collide with AirPlay on macOS (5000).
    pub server_port: u16,
    /// Raw soil-moisture value below which the soil counts as dry.
    pub dry_threshold: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let db_max_connections: u32 = optional("DB_MAX_CONNECTIONS", "5")
            .parse()
            .context("DB_MAX_CONNECTIONS must be a positive integer")?;
        ensure!(db_max_connections > 0, "DB_MAX_CONNECTIONS must be at least 1");

        Ok(Self {
            database_url: optional("DATABASE_URL", "sqlite://plant_data.db"),
            db_max_connections,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "5001")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            dry_threshold: optional("DRY_THRESHOLD", "500")
                .trim()
                .parse()
                .context("DRY_THRESHOLD must be an integer")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let c = from_pairs(&[]).unwrap();
        assert_eq!(c.database_url, "sqlite://plant_data.db");
        assert_eq!(c.db_max_connections, 5);
        assert_eq!(c.server_host, "0.0.0.0");
        assert_eq!(c.server_port, 5001);
        assert_eq!(c.dry_threshold, 500);
        assert_eq!(c.bind_addr(), "0.0.0.0:5001");
    }

    #[test]
    fn overrides_are_applied() {
        let c = from_pairs(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SERVER_PORT", "8080"),
            ("DRY_THRESHOLD", "420"),
            ("DB_MAX_CONNECTIONS", "2"),
        ])
        .unwrap();
        assert_eq!(c.database_url, "sqlite::memory:");
        assert_eq!(c.server_port, 8080);
        assert_eq!(c.dry_threshold, 420);
        assert_eq!(c.db_max_connections, 2);
    }

    #[test]
    fn invalid_port_errors() {
        let err = from_pairs(&[("SERVER_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn non_integer_threshold_errors() {
        let err = from_pairs(&[("DRY_THRESHOLD", "dry")]).unwrap_err();
        assert!(err.to_string().contains("DRY_THRESHOLD"));
    }

    #[test]
    fn zero_connections_errors() {
        let err = from_pairs(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
