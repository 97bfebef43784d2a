use std::net::IpAddr;

use chrono::Duration;

use crate::models::branch::BranchContact;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    /// How long a conversion claim stays live without being renewed.
    pub claim_lease: Duration,
    /// Branch directory for the in-memory store (`MEMORY_BRANCHES`, JSON).
    pub seed_branches: Vec<BranchContact>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = match get("STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(ConfigError::Invalid { name: "STORE", value: other.to_string() }),
        };

        let database_url = get("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let host_str = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let host = host_str
            .parse()
            .map_err(|_| ConfigError::Invalid { name: "HOST", value: host_str.clone() })?;

        let port = parse_or("PORT", get("PORT"), 3000u16)?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 10u32)?;

        let lease_secs = parse_or("CLAIM_LEASE_SECONDS", get("CLAIM_LEASE_SECONDS"), 300i64)?;
        if lease_secs <= 0 {
            return Err(ConfigError::Invalid { name: "CLAIM_LEASE_SECONDS", value: lease_secs.to_string() });
        }

        let seed_branches = match get("MEMORY_BRANCHES") {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|_| ConfigError::Invalid { name: "MEMORY_BRANCHES", value: raw.clone() })?,
        };

        Ok(Config {
            store,
            database_url,
            db_max_connections,
            jwt_secret,
            host,
            port,
            claim_lease: Duration::seconds(lease_secs),
            seed_branches,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            store: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            claim_lease: Duration::minutes(5),
            seed_branches: Vec::new(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/dispatch"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(cfg.store, StoreBackend::Postgres);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.claim_lease, Duration::minutes(5));
        assert_eq!(cfg.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn memory_store_does_not_need_a_database_url() {
        let cfg = Config::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "s"), ("CLAIM_LEASE_SECONDS", "90")])).unwrap();
        assert_eq!(cfg.store, StoreBackend::Memory);
        assert_eq!(cfg.claim_lease, Duration::seconds(90));
    }

    #[test]
    fn memory_branches_are_read_from_json() {
        let raw = r#"[{"id": 3, "name": "North Branch", "address": "12 Rizal St"}]"#;
        let cfg = Config::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "s"), ("MEMORY_BRANCHES", raw)])).unwrap();
        assert_eq!(
            cfg.seed_branches,
            vec![BranchContact { id: 3, name: "North Branch".into(), address: "12 Rizal St".into(), phone: String::new() }]
        );

        assert!(matches!(
            Config::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "s"), ("MEMORY_BRANCHES", "nope")])),
            Err(ConfigError::Invalid { name: "MEMORY_BRANCHES", .. })
        ));
    }

    #[test]
    fn rejects_missing_and_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "s")])),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("STORE", "memory")])),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "s"), ("CLAIM_LEASE_SECONDS", "0")])),
            Err(ConfigError::Invalid { name: "CLAIM_LEASE_SECONDS", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "s"), ("PORT", "http")])),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
