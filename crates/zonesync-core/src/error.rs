//! Error types for zonesync
//!
//! This module defines all error types used throughout the crate.

use crate::record::{RecordType, VersionId, ZoneId};
use std::fmt;
use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Registrar operation during which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// zone.lookup
    ZoneLookup,
    /// record.list
    RecordList,
    /// version.create
    VersionCreate,
    /// version.setRecords
    RecordSet,
    /// zone.info
    ZoneInfo,
    /// version.activate
    VersionActivate,
    /// version.delete
    VersionDelete,
}

impl Phase {
    /// Registrar operation name for this phase
    pub fn operation(&self) -> &'static str {
        match self {
            Phase::ZoneLookup => "zone.lookup",
            Phase::RecordList => "record.list",
            Phase::VersionCreate => "version.create",
            Phase::RecordSet => "version.setRecords",
            Phase::ZoneInfo => "zone.info",
            Phase::VersionActivate => "version.activate",
            Phase::VersionDelete => "version.delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Core error type for zonesync
#[derive(Error, Debug)]
pub enum Error {
    /// Public address lookup failed; fatal for the whole run
    #[error("Address resolution failed for {record_type}: {message}")]
    Resolution {
        /// Record type whose address could not be resolved
        record_type: RecordType,
        /// Underlying failure
        message: String,
    },

    /// A registrar call failed
    #[error("Registrar error during {phase}: {message}")]
    Registrar {
        /// Operation that failed
        phase: Phase,
        /// Underlying failure
        message: String,
    },

    /// Deleting a zone version failed during rollback or obsolete-version removal
    #[error("Failed to remove zone {zone_id} version {version}: {message}")]
    Cleanup {
        /// Zone the version belongs to
        zone_id: ZoneId,
        /// Version that could not be deleted
        version: VersionId,
        /// Underlying failure
        message: String,
    },

    /// Failure scoped to one domain of the desired state
    #[error("Domain {domain}: {source}")]
    Domain {
        /// Domain being processed
        domain: String,
        /// What went wrong
        #[source]
        source: Box<Error>,
    },

    /// The reconciler was handed a record type that was never resolved
    #[error("No resolved address for record type {0}")]
    MissingAddress(RecordType),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote procedure call faults reported by the registrar
    #[error("RPC fault {code}: {message}")]
    Rpc {
        /// Fault code
        code: i64,
        /// Fault string
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(record_type: RecordType, msg: impl Into<String>) -> Self {
        Self::Resolution {
            record_type,
            message: msg.into(),
        }
    }

    /// Create a registrar error for a phase
    pub fn registrar(phase: Phase, msg: impl Into<String>) -> Self {
        Self::Registrar {
            phase,
            message: msg.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(zone_id: ZoneId, version: VersionId, msg: impl Into<String>) -> Self {
        Self::Cleanup {
            zone_id,
            version,
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an RPC fault error
    pub fn rpc(code: i64, msg: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: msg.into(),
        }
    }

    /// Tag a collaborator failure with the registrar phase it happened in
    ///
    /// Errors that already carry a phase keep it.
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            Self::Registrar { .. } => self,
            other => Self::registrar(phase, other.to_string()),
        }
    }

    /// Attach the domain being processed
    pub fn in_domain(self, domain: impl Into<String>) -> Self {
        Self::Domain {
            domain: domain.into(),
            source: Box::new(self),
        }
    }

    /// Registrar phase of this error, looking through domain context
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Registrar { phase, .. } => Some(*phase),
            Self::Domain { source, .. } => source.phase(),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
