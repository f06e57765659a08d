use crate::catalog::{Catalog, CatalogError};
use crate::model::Resource;

/// Server settings, read once from `CAMPUSFLOW_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub password: String,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub strict_resources: bool,
    pub catalog: Catalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5433,
            password: "campusflow".into(),
            max_connections: 256,
            metrics_port: None,
            tls_cert: None,
            tls_key: None,
            strict_resources: true,
            catalog: Catalog::seed(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let catalog = match lookup("CAMPUSFLOW_CATALOG") {
            Some(spec) => parse_catalog(&spec)?,
            None => defaults.catalog,
        };
        Ok(Self {
            bind: lookup("CAMPUSFLOW_BIND").unwrap_or(defaults.bind),
            port: parse_var(&lookup, "CAMPUSFLOW_PORT")?.unwrap_or(defaults.port),
            password: lookup("CAMPUSFLOW_PASSWORD").unwrap_or(defaults.password),
            max_connections: parse_var(&lookup, "CAMPUSFLOW_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            metrics_port: parse_var(&lookup, "CAMPUSFLOW_METRICS_PORT")?,
            tls_cert: lookup("CAMPUSFLOW_TLS_CERT"),
            tls_key: lookup("CAMPUSFLOW_TLS_KEY"),
            strict_resources: match lookup("CAMPUSFLOW_STRICT_RESOURCES") {
                Some(v) => parse_bool("CAMPUSFLOW_STRICT_RESOURCES", &v)?,
                None => defaults.strict_resources,
            },
            catalog,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(None),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Ok(true),
        "false" | "f" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Parse `ID:KIND:CAPACITY` entries separated by commas.
pub fn parse_catalog(spec: &str) -> Result<Catalog, ConfigError> {
    let mut resources = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let [id, kind, capacity] = parts[..] else {
            return Err(ConfigError::Catalog(format!(
                "expected ID:KIND:CAPACITY, got {entry:?}"
            )));
        };
        let capacity: u32 = capacity
            .parse()
            .map_err(|_| ConfigError::Catalog(format!("bad capacity in {entry:?}")))?;
        resources.push(Resource::new(id, kind, capacity));
    }
    Catalog::new(resources).map_err(ConfigError::from)
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    Catalog(String),
}

impl From<CatalogError> for ConfigError {
    fn from(e: CatalogError) -> Self {
        ConfigError::Catalog(e.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {key}: {value:?}"),
            ConfigError::Catalog(msg) => write!(f, "invalid CAMPUSFLOW_CATALOG: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5433");
        assert_eq!(cfg.max_connections, 256);
        assert_eq!(cfg.metrics_port, None);
        assert!(cfg.strict_resources);
        assert_eq!(cfg.catalog.len(), 3);
    }

    #[test]
    fn overrides_from_lookup() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("CAMPUSFLOW_PORT", "6000"),
            ("CAMPUSFLOW_BIND", "127.0.0.1"),
            ("CAMPUSFLOW_METRICS_PORT", "9100"),
            ("CAMPUSFLOW_STRICT_RESOURCES", "false"),
            ("CAMPUSFLOW_CATALOG", "G1:Gym:120, M2:Music room:15"),
        ]))
        .unwrap();
        assert_eq!(cfg.listen_addr(), "127.0.0.1:6000");
        assert_eq!(cfg.metrics_port, Some(9100));
        assert!(!cfg.strict_resources);
        assert_eq!(cfg.catalog.len(), 2);
        assert_eq!(cfg.catalog.get("M2").unwrap().kind, "Music room");
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("CAMPUSFLOW_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("CAMPUSFLOW_PORT"));
    }

    #[test]
    fn bad_bool_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("CAMPUSFLOW_STRICT_RESOURCES", "maybe")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn catalog_entry_shape_checked() {
        assert!(parse_catalog("R101:Classroom").is_err());
        assert!(parse_catalog("R101:Classroom:lots").is_err());
        assert!(parse_catalog("R101:Classroom:0").is_err());
        assert!(parse_catalog("R101:Classroom:60,R101:Lab:40").is_err());
    }

    #[test]
    fn catalog_ignores_blank_entries() {
        let catalog = parse_catalog("R101:Classroom:60,, ").unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
