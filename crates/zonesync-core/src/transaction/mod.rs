//! Zone version transactions
//!
//! Publishes an [`UpdatePlan`] as a new zone version:
//!
//! ```text
//! version.create ──► version.setRecords ──► [zone.info] ──► version.activate ──► [version.delete(old)]
//!       │                    │                   │                  │
//!       ▼                    └─────── failure ───┴──────────────────┘
//!   propagate                              │
//!                                          ▼
//!                              version.delete(new), propagate
//! ```
//!
//! Until activation succeeds every failure deletes the draft version and
//! surfaces the original error, whatever happens to the delete. After
//! activation the new version is live and is never rolled back; failing to
//! delete the previously active version is only a warning.
//!
//! The transaction body runs on its own task. Once the draft version
//! exists, dropping the caller's future does not stop the transaction
//! short of a terminal state.

use crate::engine::events::{EngineEvent, EventEmitter};
use crate::error::{Error, Phase, Result};
use crate::reconcile::UpdatePlan;
use crate::record::VersionId;
use crate::traits::Registrar;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a published transaction
#[derive(Debug)]
pub struct PublishOutcome {
    /// Version now active for the zone
    pub version: VersionId,
    /// Version that was active before, when it was looked up
    pub previous_version: Option<VersionId>,
    /// Previously active version that was deleted
    pub removed_version: Option<VersionId>,
    /// Non-fatal failure to delete the previously active version
    pub cleanup_warning: Option<Error>,
}

/// Publishes update plans through a registrar
#[derive(Clone)]
pub struct ZoneTransaction {
    registrar: Arc<dyn Registrar>,
    events: EventEmitter,
}

impl ZoneTransaction {
    /// Create a transaction manager
    pub fn new(registrar: Arc<dyn Registrar>, events: EventEmitter) -> Self {
        Self { registrar, events }
    }

    /// Publish `plan` as the zone's new active version
    ///
    /// With `remove_obsolete_version`, the version active just before
    /// activation is deleted afterwards.
    ///
    /// # Returns
    ///
    /// - `Ok(PublishOutcome)`: The new version is active
    /// - `Err(Error::Registrar)`: The transaction failed and was rolled back
    pub async fn publish(
        &self,
        plan: UpdatePlan,
        remove_obsolete_version: bool,
    ) -> Result<PublishOutcome> {
        let registrar = Arc::clone(&self.registrar);
        let events = self.events.clone();

        tokio::spawn(async move {
            run_transaction(registrar.as_ref(), &events, &plan, remove_obsolete_version).await
        })
        .await
        .map_err(|e| Error::Other(format!("Zone transaction task failed: {}", e)))?
    }
}

async fn run_transaction(
    registrar: &dyn Registrar,
    events: &EventEmitter,
    plan: &UpdatePlan,
    remove_obsolete_version: bool,
) -> Result<PublishOutcome> {
    let domain = plan.domain.as_str();
    let zone = plan.zone_id;

    debug!("Creating new zone version for {}", domain);
    let version = registrar
        .create_version(zone)
        .await
        .map_err(|e| e.in_phase(Phase::VersionCreate))?;
    info!("Created zone for {} as version {}", domain, version);
    events.emit(EngineEvent::VersionCreated {
        domain: domain.to_string(),
        version,
    });

    let previous_version =
        match stage_and_activate(registrar, events, plan, version, remove_obsolete_version).await
        {
            Ok(previous) => previous,
            Err(err) => {
                roll_back(registrar, events, plan, version).await;
                return Err(err);
            }
        };

    let mut outcome = PublishOutcome {
        version,
        previous_version,
        removed_version: None,
        cleanup_warning: None,
    };

    match previous_version {
        None => {
            debug!("Keeping previous zone versions for {}", domain);
            events.emit(EngineEvent::ObsoleteVersionRetained {
                domain: domain.to_string(),
            });
        }
        Some(old) if old == version => {
            warn!(
                "Zone {} reported version {} as active before activation, not removing it",
                domain, old
            );
            events.emit(EngineEvent::ObsoleteVersionRetained {
                domain: domain.to_string(),
            });
        }
        Some(old) => {
            debug!("Removing obsolete zone {} version {}", domain, old);
            match registrar.delete_version(zone, old).await {
                Ok(()) => {
                    info!("Removed zone {} version {}", domain, old);
                    outcome.removed_version = Some(old);
                    events.emit(EngineEvent::ObsoleteVersionRemoved {
                        domain: domain.to_string(),
                        version: old,
                    });
                }
                Err(e) => {
                    let cleanup = Error::cleanup(zone, old, e.to_string());
                    warn!("Zone {} is published but cleanup failed: {}", domain, cleanup);
                    events.emit(EngineEvent::ObsoleteVersionRemovalFailed {
                        domain: domain.to_string(),
                        version: old,
                        error: cleanup.to_string(),
                    });
                    outcome.cleanup_warning = Some(cleanup);
                }
            }
        }
    }

    Ok(outcome)
}

/// Populate the draft version and activate it
///
/// Returns the version that was active before activation when
/// `remove_obsolete_version` asks for it. It is read after the records are
/// written, as late as possible, so a concurrent change to the zone is not
/// acted on with a stale id.
async fn stage_and_activate(
    registrar: &dyn Registrar,
    events: &EventEmitter,
    plan: &UpdatePlan,
    version: VersionId,
    remove_obsolete_version: bool,
) -> Result<Option<VersionId>> {
    let domain = plan.domain.as_str();
    let zone = plan.zone_id;

    debug!("Updating zone for {} with new settings", domain);
    registrar
        .set_records(zone, version, &plan.records)
        .await
        .map_err(|e| e.in_phase(Phase::RecordSet))?;
    info!(
        "Applied {} records to zone {} version {}",
        plan.records.len(),
        domain,
        version
    );
    events.emit(EngineEvent::RecordsApplied {
        domain: domain.to_string(),
        version,
        count: plan.records.len(),
    });

    let previous = if remove_obsolete_version {
        debug!("Getting current version for zone {}", domain);
        let current = registrar
            .active_version(zone)
            .await
            .map_err(|e| e.in_phase(Phase::ZoneInfo))?;
        info!("Current version for zone {} is {}", domain, current);
        events.emit(EngineEvent::CurrentVersionIdentified {
            domain: domain.to_string(),
            version: current,
        });
        Some(current)
    } else {
        None
    };

    debug!("Enabling zone for {} as version {}", domain, version);
    registrar
        .activate_version(zone, version)
        .await
        .map_err(|e| e.in_phase(Phase::VersionActivate))?;
    info!("Enabled zone for {} as version {}", domain, version);
    events.emit(EngineEvent::VersionActivated {
        domain: domain.to_string(),
        version,
    });

    Ok(previous)
}

/// Delete a draft version after a failed transaction
///
/// A failed delete is logged and emitted; the caller keeps propagating the
/// error that caused the rollback.
async fn roll_back(
    registrar: &dyn Registrar,
    events: &EventEmitter,
    plan: &UpdatePlan,
    version: VersionId,
) {
    let domain = plan.domain.as_str();
    let zone = plan.zone_id;

    error!("Removing zone {} version {}", domain, version);
    match registrar.delete_version(zone, version).await {
        Ok(()) => {
            info!("Rolled back zone {} version {}", domain, version);
            events.emit(EngineEvent::RolledBack {
                domain: domain.to_string(),
                version,
            });
        }
        Err(e) => {
            let cleanup = Error::cleanup(zone, version, e.to_string());
            error!(
                "Draft version left behind for zone {}, remove it manually: {}",
                domain, cleanup
            );
            events.emit(EngineEvent::RollbackFailed {
                domain: domain.to_string(),
                version,
                error: cleanup.to_string(),
            });
        }
    }
}
