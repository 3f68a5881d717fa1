//! Core zonesync engine
//!
//! The SyncEngine is responsible for:
//! - Resolving the public addresses referenced by the desired state, once
//! - Building an update plan per domain from its live records
//! - Publishing changed plans as new zone versions, domain by domain
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ AddressResolver │── one lookup per record type ──┐
//! └─────────────────┘                                │
//!                                                    ▼
//!                                           ┌──────────────┐
//!                                           │  SyncEngine  │
//!                                           └──────────────┘
//!                                                    │
//!          ┌─────────────────────────────────────────┼───────────────────────┐
//!          │ fan-out (bounded)                       │ sequential, fail-fast │
//!          ▼                                         ▼                       ▼
//! ┌──────────────────┐                     ┌──────────────────┐    ┌─────────────┐
//! │ Registrar reads  │── reconcile() ──►   │ ZoneTransaction  │    │   Events    │
//! │ zone + records   │    UpdatePlan       │ create/set/      │    │  (notify)   │
//! └──────────────────┘                     │ activate/cleanup │    └─────────────┘
//!                                          └──────────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Resolve the union of record types across all domains
//! 2. For every domain, concurrently: look up the zone, list live records, reconcile
//! 3. For every domain, in declared order: skip unchanged plans, publish the rest
//! 4. Stop at the first domain that failed in step 2 or 3

pub mod events;

pub use events::{EngineEvent, EventEmitter};

use crate::addresses::resolve_addresses;
use crate::config::{DesiredState, DomainRecords, EngineConfig, SyncConfig};
use crate::error::{Phase, Result};
use crate::reconcile::{RecordChange, UpdatePlan, reconcile};
use crate::record::{ResolvedAddresses, VersionId};
use crate::traits::{AddressResolver, Registrar};
use crate::transaction::ZoneTransaction;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What happened to one domain during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainStatus {
    /// Zone already matched the desired records
    Unchanged,
    /// A new zone version was published
    Published {
        /// Newly active version
        version: VersionId,
        /// Previously active version that was deleted
        removed_version: Option<VersionId>,
        /// Non-fatal cleanup failure after activation
        cleanup_warning: Option<String>,
    },
}

/// Per-domain result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainOutcome {
    /// Domain name
    pub domain: String,
    /// What happened
    pub status: DomainStatus,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Outcome per domain, in declared order
    pub domains: Vec<DomainOutcome>,
}

impl RunReport {
    /// Number of domains that got a new zone version
    pub fn published(&self) -> usize {
        self.domains
            .iter()
            .filter(|d| matches!(d.status, DomainStatus::Published { .. }))
            .count()
    }

    /// Number of domains left untouched
    pub fn unchanged(&self) -> usize {
        self.domains.len() - self.published()
    }

    /// Non-fatal cleanup failures, as (domain, message)
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.domains.iter().filter_map(|d| match &d.status {
            DomainStatus::Published {
                cleanup_warning: Some(warning),
                ..
            } => Some((d.domain.as_str(), warning.as_str())),
            _ => None,
        })
    }
}

/// Core zonesync engine
///
/// Drives one run to completion per call to [`SyncEngine::run()`]. Repeated
/// runs are the job of an external timer.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`], keeping the event receiver
/// 2. Call [`SyncEngine::run()`]
/// 3. Inspect the [`RunReport`] or the fatal error
pub struct SyncEngine {
    /// Public address discovery
    resolver: Arc<dyn AddressResolver>,

    /// Registrar holding the zones
    registrar: Arc<dyn Registrar>,

    /// Domains and records to keep in sync
    desired: DesiredState,

    /// Delete the previously active version after activation
    remove_obsolete_version: bool,

    /// Maximum concurrent plan builds
    plan_concurrency: usize,

    /// Event sender for external monitoring
    events: EventEmitter,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: Address resolver implementation
    /// - `registrar`: Registrar implementation
    /// - `desired`: Domains and records to keep in sync
    /// - `remove_obsolete_version`: Delete the previously active version after activation
    /// - `engine`: Engine tuning
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Arc<dyn AddressResolver>,
        registrar: Arc<dyn Registrar>,
        desired: DesiredState,
        remove_obsolete_version: bool,
        engine: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        desired.validate()?;
        engine.validate()?;

        let (events, rx) = EventEmitter::channel(engine.event_channel_capacity);

        let engine = Self {
            resolver,
            registrar,
            desired,
            remove_obsolete_version,
            plan_concurrency: engine.plan_concurrency,
            events,
        };

        Ok((engine, rx))
    }

    /// Create an engine from a loaded configuration
    pub fn from_config(
        resolver: Arc<dyn AddressResolver>,
        registrar: Arc<dyn Registrar>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        Self::new(
            resolver,
            registrar,
            config.domains.clone(),
            config.remove_obsolete_zone_version,
            &config.engine,
        )
    }

    /// Run one reconciliation pass over every domain
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: Every domain is in sync (cleanup warnings possible)
    /// - `Err(Error)`: The first fatal error; domains after it were not touched
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        self.events.emit(EngineEvent::RunStarted {
            domains: self.desired.len(),
        });

        match self.run_internal().await {
            Ok(domains) => {
                let report = RunReport {
                    started_at,
                    finished_at: Utc::now(),
                    domains,
                };
                info!(
                    "Run completed: {} published, {} unchanged",
                    report.published(),
                    report.unchanged()
                );
                self.events.emit(EngineEvent::RunCompleted {
                    published: report.published(),
                    unchanged: report.unchanged(),
                });
                Ok(report)
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.events.emit(EngineEvent::RunFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_internal(&self) -> Result<Vec<DomainOutcome>> {
        let record_types = self.desired.record_types();
        let addresses = resolve_addresses(self.resolver.as_ref(), &record_types).await?;
        info!(
            "Found public IPs: {}",
            addresses
                .iter()
                .map(|(t, a)| format!("{}={}", t, a))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.events.emit(EngineEvent::AddressesResolved {
            addresses: addresses
                .iter()
                .map(|(t, a)| (t, a.to_string()))
                .collect(),
        });

        let plans: Vec<Result<UpdatePlan>> = stream::iter(&self.desired.domains)
            .map(|entry| self.build_plan(entry, &addresses))
            .buffered(self.plan_concurrency)
            .collect()
            .await;

        let transaction = ZoneTransaction::new(Arc::clone(&self.registrar), self.events.clone());
        let mut outcomes = Vec::with_capacity(plans.len());

        for (entry, plan) in self.desired.domains.iter().zip(plans) {
            let plan = plan.map_err(|e| e.in_domain(&entry.domain))?;

            if !plan.changed() {
                info!("Nothing to update on domain {}", plan.domain);
                self.events.emit(EngineEvent::NothingToUpdate {
                    domain: plan.domain.clone(),
                });
                outcomes.push(DomainOutcome {
                    domain: plan.domain,
                    status: DomainStatus::Unchanged,
                });
                continue;
            }

            let domain = plan.domain.clone();
            let published = transaction
                .publish(plan, self.remove_obsolete_version)
                .await
                .map_err(|e| e.in_domain(&domain))?;

            if let Some(warning) = &published.cleanup_warning {
                warn!("Domain {} published with a cleanup warning: {}", domain, warning);
            }

            outcomes.push(DomainOutcome {
                domain,
                status: DomainStatus::Published {
                    version: published.version,
                    removed_version: published.removed_version,
                    cleanup_warning: published.cleanup_warning.map(|w| w.to_string()),
                },
            });
        }

        Ok(outcomes)
    }

    /// Read a domain's zone and reconcile it against the desired records
    async fn build_plan(
        &self,
        entry: &DomainRecords,
        addresses: &ResolvedAddresses,
    ) -> Result<UpdatePlan> {
        let domain = entry.domain.as_str();

        debug!("Querying domain information for {}", domain);
        let zone_id = self
            .registrar
            .lookup_zone(domain)
            .await
            .map_err(|e| e.in_phase(Phase::ZoneLookup))?;
        debug!("Zone ID for {} is {}", domain, zone_id);
        self.events.emit(EngineEvent::ZoneResolved {
            domain: domain.to_string(),
            zone_id,
        });

        let live = self
            .registrar
            .list_records(zone_id)
            .await
            .map_err(|e| e.in_phase(Phase::RecordList))?;
        debug!("Fetched {} live records for {}", live.len(), domain);
        self.events.emit(EngineEvent::LiveRecordsFetched {
            domain: domain.to_string(),
            count: live.len(),
        });

        let plan = reconcile(domain, zone_id, &entry.records, addresses, &live)?;
        for change in &plan.changes {
            self.report_change(domain, change);
        }

        Ok(plan)
    }

    fn report_change(&self, domain: &str, change: &RecordChange) {
        match change.clone() {
            RecordChange::Update {
                name,
                record_type,
                old_value,
                old_ttl,
                new_value,
                new_ttl,
            } => {
                info!(
                    "Will set {} ({}) on {} to IP {} and TTL {}s (previously {} and {}s)",
                    name, record_type, domain, new_value, new_ttl, old_value, old_ttl
                );
                self.events.emit(EngineEvent::RecordWillUpdate {
                    domain: domain.to_string(),
                    name,
                    record_type,
                    old_value,
                    old_ttl,
                    new_value,
                    new_ttl,
                });
            }
            RecordChange::Add {
                name,
                record_type,
                value,
                ttl,
            } => {
                info!(
                    "Will add new record {} ({}) on {} with IP {} and TTL {}s",
                    name, record_type, domain, value, ttl
                );
                self.events.emit(EngineEvent::RecordWillAdd {
                    domain: domain.to_string(),
                    name,
                    record_type,
                    value,
                    ttl,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_and_warnings() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            domains: vec![
                DomainOutcome {
                    domain: "a.example".into(),
                    status: DomainStatus::Unchanged,
                },
                DomainOutcome {
                    domain: "b.example".into(),
                    status: DomainStatus::Published {
                        version: VersionId(3),
                        removed_version: None,
                        cleanup_warning: Some("version 2 still in use".into()),
                    },
                },
            ],
        };

        assert_eq!(report.published(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(
            report.warnings().collect::<Vec<_>>(),
            [("b.example", "version 2 still in use")]
        );
    }
}
