//! Record and zone data model
//!
//! Desired records come from configuration, live records from the
//! registrar. Zone and version identifiers are opaque registrar numbers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address record type managed by zonesync
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registrar zone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u64);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registrar zone version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(pub u64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One record the operator wants published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Record name relative to the zone (e.g. "@" or "www")
    pub name: String,

    /// Record type, which also selects the address family
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl DesiredRecord {
    /// Create a desired record with the default TTL
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl: default_ttl(),
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

fn default_ttl() -> u32 {
    300
}

/// A record as published by the registrar
///
/// Fields the registrar returns beyond name, type, value and TTL are kept
/// in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRecord {
    /// Record name relative to the zone
    pub name: String,

    /// Record type; live zones hold more than A/AAAA
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record value
    pub value: String,

    /// Time-to-live in seconds
    pub ttl: u32,

    /// Registrar-specific fields, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LiveRecord {
    /// Create a live record without registrar-specific fields
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
            ttl,
            extra: serde_json::Map::new(),
        }
    }

    /// Whether this record has the given (name, type) key
    pub fn matches(&self, name: &str, record_type: RecordType) -> bool {
        self.name == name && self.record_type == record_type.as_str()
    }
}

/// Public addresses resolved for one run, keyed by record type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    addresses: BTreeMap<RecordType, String>,
}

impl ResolvedAddresses {
    /// Create an empty address set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the address for a record type
    pub fn insert(&mut self, record_type: RecordType, address: impl Into<String>) {
        self.addresses.insert(record_type, address.into());
    }

    /// Address for a record type, if it was resolved
    pub fn get(&self, record_type: RecordType) -> Option<&str> {
        self.addresses.get(&record_type).map(String::as_str)
    }

    /// Number of resolved families
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether no family was resolved
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterate in record type order
    pub fn iter(&self) -> impl Iterator<Item = (RecordType, &str)> {
        self.addresses.iter().map(|(t, a)| (*t, a.as_str()))
    }
}

impl FromIterator<(RecordType, String)> for ResolvedAddresses {
    fn from_iter<I: IntoIterator<Item = (RecordType, String)>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}
