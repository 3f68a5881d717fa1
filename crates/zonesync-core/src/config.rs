//! Configuration types for zonesync
//!
//! This module defines the configuration file layout and the desired state
//! handed to the engine.

use crate::error::{Error, Result};
use crate::record::{DesiredRecord, RecordType};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

/// Default Gandi XML-RPC endpoint
pub const DEFAULT_REGISTRAR_URL: &str = "https://rpc.gandi.net/xmlrpc/";

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "zonesync.log";

/// Log levels accepted in configuration
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal"];

/// Main zonesync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Registrar API key
    pub api_key: String,

    /// Registrar endpoint
    #[serde(default = "default_registrar_url")]
    pub registrar_url: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log file, rotated weekly; `null` disables file logging
    #[serde(default = "default_log_file")]
    pub log_file: Option<String>,

    /// Delete the previously active zone version after activation
    #[serde(default)]
    pub remove_obsolete_zone_version: bool,

    /// Public address lookup settings
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Records to keep in sync, per domain
    pub domains: DesiredState,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the key and domains
    pub fn new(api_key: impl Into<String>, domains: DesiredState) -> Self {
        Self {
            api_key: api_key.into(),
            registrar_url: default_registrar_url(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            remove_obsolete_zone_version: false,
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
            domains,
        }
    }

    /// Read and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("Cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.len() != 24 || !self.api_key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::config(
                "api_key must be exactly 24 alphanumeric characters",
            ));
        }

        validate_url("registrar_url", &self.registrar_url)?;

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level '{}' is not valid. Valid levels: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        if self.log_file.as_deref().is_some_and(str::is_empty) {
            return Err(Error::config("log_file cannot be empty"));
        }

        self.ip_source.validate()?;
        self.engine.validate()?;
        self.domains.validate()
    }
}

fn default_registrar_url() -> String {
    DEFAULT_REGISTRAR_URL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_file() -> Option<String> {
    Some(DEFAULT_LOG_FILE.to_string())
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: '{}'",
            field, url
        )));
    }
    Ok(())
}

/// Public address lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL answering with the caller's IPv4 address as plain text
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,

    /// URL answering with the caller's IPv6 address as plain text
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("ip_source.ipv4_url", &self.ipv4_url)?;
        validate_url("ip_source.ipv6_url", &self.ipv6_url)
    }

    /// Lookup URL for a record type's family
    pub fn url_for(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::A => &self.ipv4_url,
            RecordType::Aaaa => &self.ipv6_url,
        }
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
        }
    }
}

fn default_ipv4_url() -> String {
    "https://api.ipify.org".to_string()
}

fn default_ipv6_url() -> String {
    "https://api6.ipify.org".to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of domains whose plans are built at the same time
    #[serde(default = "default_plan_concurrency")]
    pub plan_concurrency: usize,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.plan_concurrency == 0 {
            return Err(Error::config("engine.plan_concurrency must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("engine.event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plan_concurrency: default_plan_concurrency(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_plan_concurrency() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Desired records of one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecords {
    /// Domain name (e.g. "example.com")
    pub domain: String,
    /// Records to keep in sync, in declared order
    pub records: Vec<DesiredRecord>,
}

impl DomainRecords {
    /// Create a domain entry
    pub fn new(domain: impl Into<String>, records: Vec<DesiredRecord>) -> Self {
        Self {
            domain: domain.into(),
            records,
        }
    }
}

/// Desired state: domains in declared order
///
/// In configuration this is a JSON object mapping domain name to a record
/// list; object order is the order domains are published in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    /// Domains in declared order
    pub domains: Vec<DomainRecords>,
}

impl DesiredState {
    /// Create an empty desired state
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a domain
    pub fn with_domain(mut self, domain: impl Into<String>, records: Vec<DesiredRecord>) -> Self {
        self.domains.push(DomainRecords::new(domain, records));
        self
    }

    /// Every record type referenced by any domain
    pub fn record_types(&self) -> BTreeSet<RecordType> {
        self.domains
            .iter()
            .flat_map(|d| d.records.iter().map(|r| r.record_type))
            .collect()
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether no domain is configured
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Validate domain names and record sets
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(Error::config("No domains configured"));
        }

        let mut seen_domains = HashSet::new();
        for entry in &self.domains {
            validate_domain_name(&entry.domain)?;

            if !seen_domains.insert(entry.domain.as_str()) {
                return Err(Error::config(format!(
                    "Domain {} is configured twice",
                    entry.domain
                )));
            }

            if entry.records.is_empty() {
                return Err(Error::config(format!(
                    "Domain {} has no records",
                    entry.domain
                )));
            }

            let mut keys = HashSet::new();
            for record in &entry.records {
                if record.name.is_empty() {
                    return Err(Error::config(format!(
                        "Domain {} has a record with an empty name",
                        entry.domain
                    )));
                }
                if !keys.insert((record.name.as_str(), record.record_type)) {
                    return Err(Error::config(format!(
                        "Domain {} declares {} ({}) more than once",
                        entry.domain, record.name, record.record_type
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A domain name needs a dot with at least one character on either side
fn validate_domain_name(domain: &str) -> Result<()> {
    let valid = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !valid {
        return Err(Error::config(format!(
            "Invalid domain name: '{}'",
            domain
        )));
    }
    Ok(())
}

impl Serialize for DesiredState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.domains.len()))?;
        for entry in &self.domains {
            map.serialize_entry(&entry.domain, &entry.records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DesiredState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DomainsVisitor;

        impl<'de> Visitor<'de> for DomainsVisitor {
            type Value = DesiredState;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of domain name to record list")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut domains = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((domain, records)) =
                    access.next_entry::<String, Vec<DesiredRecord>>()?
                {
                    domains.push(DomainRecords { domain, records });
                }
                Ok(DesiredState { domains })
            }
        }

        deserializer.deserialize_map(DomainsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "abcdefghijklmnopqrstuvwx";

    const SAMPLE: &str = r#"{
        "api_key": "abcdefghijklmnopqrstuvwx",
        "domains": {
            "zeta.example": [ { "name": "@", "type": "A", "ttl": 600 } ],
            "alpha.example": [
                { "name": "www", "type": "AAAA" },
                { "name": "@", "type": "A" }
            ]
        }
    }"#;

    fn sample() -> serde_json::Value {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.registrar_url, DEFAULT_REGISTRAR_URL);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_file.as_deref(), Some(DEFAULT_LOG_FILE));
        assert!(!config.remove_obsolete_zone_version);
        assert_eq!(config.engine.plan_concurrency, 4);
        assert_eq!(config.domains.domains[1].records[0].ttl, 300);
    }

    #[test]
    fn domain_order_is_preserved() {
        let config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        let names: Vec<_> = config.domains.domains.iter().map(|d| d.domain.as_str()).collect();
        assert_eq!(names, ["zeta.example", "alpha.example"]);

        let types: Vec<_> = config.domains.record_types().into_iter().collect();
        assert_eq!(types, [RecordType::A, RecordType::Aaaa]);
    }

    #[test]
    fn null_log_file_disables_file_logging() {
        let mut value = sample();
        value["log_file"] = serde_json::Value::Null;
        let config: SyncConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.log_file, None);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_api_key() {
        let mut value = sample();
        value["api_key"] = serde_json::json!("short");
        let config: SyncConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_unknown_record_type() {
        let mut value = sample();
        value["domains"]["zeta.example"][0]["type"] = serde_json::json!("MX");
        assert!(serde_json::from_value::<SyncConfig>(value).is_err());
    }

    #[test]
    fn rejects_domain_without_dot() {
        let state = DesiredState::new()
            .with_domain("localhost", vec![DesiredRecord::new("@", RecordType::A)]);
        assert!(state.validate().is_err());

        let state = DesiredState::new()
            .with_domain("example.", vec![DesiredRecord::new("@", RecordType::A)]);
        assert!(state.validate().is_err());
    }

    #[test]
    fn rejects_empty_and_duplicate_records() {
        let empty = DesiredState::new().with_domain("example.com", vec![]);
        assert!(empty.validate().is_err());

        let duplicate = DesiredState::new().with_domain(
            "example.com",
            vec![
                DesiredRecord::new("@", RecordType::A),
                DesiredRecord::new("@", RecordType::A).with_ttl(60),
            ],
        );
        assert!(duplicate.validate().is_err());

        let distinct = DesiredState::new().with_domain(
            "example.com",
            vec![
                DesiredRecord::new("@", RecordType::A),
                DesiredRecord::new("@", RecordType::Aaaa),
            ],
        );
        assert!(distinct.validate().is_ok());
    }

    #[test]
    fn rejects_no_domains() {
        let config = SyncConfig::new(KEY, DesiredState::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut value = sample();
        value["log_level"] = serde_json::json!("verbose");
        let config: SyncConfig = serde_json::from_value(value).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let config = SyncConfig::from_file(file.path()).unwrap();
        assert_eq!(config.domains.len(), 2);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
