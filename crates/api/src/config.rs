//! Process configuration, read from the environment.

use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const ENV_BIND_ADDR: &str = "WMS_BIND_ADDR";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DB_MAX_CONNECTIONS: &str = "WMS_DB_MAX_CONNECTIONS";
/// `json` (default) or `pretty`; read before logging is initialized.
pub const ENV_LOG_FORMAT: &str = "WMS_LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres backends when set; in-memory stores otherwise.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// In-memory configuration (tests, local dev).
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .with_context(|| format!("invalid {ENV_BIND_ADDR}"))?;

        let jwt_secret = match lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("{ENV_JWT_SECRET} not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_url = lookup(ENV_DATABASE_URL).filter(|s| !s.trim().is_empty());

        let db_max_connections = match lookup(ENV_DB_MAX_CONNECTIONS) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid {ENV_DB_MAX_CONNECTIONS}: {raw}"))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            db_max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_on_port_8080() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.db_max_connections, 10);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
            (ENV_JWT_SECRET, "s3cret"),
            (ENV_DATABASE_URL, "postgres://localhost/wms"),
            (ENV_DB_MAX_CONNECTIONS, "4"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/wms"));
        assert_eq!(cfg.db_max_connections, 4);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config(&[(ENV_BIND_ADDR, "not-an-addr")]).is_err());
        assert!(config(&[(ENV_DB_MAX_CONNECTIONS, "many")]).is_err());
    }
}
