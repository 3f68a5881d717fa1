//! Engine events
//!
//! Every observable step of a run is emitted as an [`EngineEvent`] on a
//! bounded channel, next to the matching `tracing` log line. Consumers
//! that are too slow lose events; the engine never blocks on them.

use crate::record::{RecordType, VersionId, ZoneId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Run started
    RunStarted { domains: usize },

    /// Public addresses resolved for the run
    AddressesResolved { addresses: Vec<(RecordType, String)> },

    /// Zone identifier found for a domain
    ZoneResolved { domain: String, zone_id: ZoneId },

    /// Live records fetched for a domain
    LiveRecordsFetched { domain: String, count: usize },

    /// An existing record will get a new value and/or TTL
    RecordWillUpdate {
        domain: String,
        name: String,
        record_type: RecordType,
        old_value: String,
        old_ttl: u32,
        new_value: String,
        new_ttl: u32,
    },

    /// A missing record will be added
    RecordWillAdd {
        domain: String,
        name: String,
        record_type: RecordType,
        value: String,
        ttl: u32,
    },

    /// Domain already matches the desired state
    NothingToUpdate { domain: String },

    /// Draft zone version created
    VersionCreated { domain: String, version: VersionId },

    /// Records written to the draft version
    RecordsApplied {
        domain: String,
        version: VersionId,
        count: usize,
    },

    /// Active version captured ahead of activation
    CurrentVersionIdentified { domain: String, version: VersionId },

    /// Draft version made active
    VersionActivated { domain: String, version: VersionId },

    /// Previously active version deleted
    ObsoleteVersionRemoved { domain: String, version: VersionId },

    /// Previously active version kept
    ObsoleteVersionRetained { domain: String },

    /// Previously active version could not be deleted (non-fatal)
    ObsoleteVersionRemovalFailed {
        domain: String,
        version: VersionId,
        error: String,
    },

    /// Draft version deleted after a failed transaction
    RolledBack { domain: String, version: VersionId },

    /// Draft version could not be deleted; it must be removed by hand
    RollbackFailed {
        domain: String,
        version: VersionId,
        error: String,
    },

    /// Run finished successfully
    RunCompleted { published: usize, unchanged: usize },

    /// Run aborted
    RunFailed { error: String },
}

/// Cloneable sending half for engine events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiver consumers read from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Emit an engine event without waiting
    pub fn emit(&self, event: EngineEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Event channel full, dropping event. Consider increasing event_channel_capacity."
                );
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
