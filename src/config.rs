use anyhow::Context;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Config {
            port: get("PORT").unwrap_or_else(|| "8083".to_string()).parse().context("PORT must be a port number")?,
            database_url: get("DATABASE_URL").context("DATABASE_URL is required")?,
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            nats_url: get("NATS_URL").filter(|url| !url.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.database_max_connections, 10);
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_nats_url_ignored() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("NATS_URL", " ")])).unwrap();
        assert!(config.nats_url.is_none());
    }
}
