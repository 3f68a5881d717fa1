//! Record reconciliation
//!
//! [`reconcile`] diffs the desired records of one domain against the
//! zone's live records and produces an [`UpdatePlan`]: the complete record
//! list the zone should hold, plus the per-record decisions that led to it.
//!
//! The plan is a full replacement list, not a delta. Live records that no
//! desired record refers to are carried over unchanged and in order, because
//! the registrar replaces the whole record set of a zone version at once.

use crate::error::{Error, Result};
use crate::record::{DesiredRecord, LiveRecord, RecordType, ResolvedAddresses, ZoneId};

/// A single decision taken while reconciling a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// An existing record gets a new value and/or TTL
    Update {
        name: String,
        record_type: RecordType,
        old_value: String,
        old_ttl: u32,
        new_value: String,
        new_ttl: u32,
    },
    /// A record missing from the zone is added
    Add {
        name: String,
        record_type: RecordType,
        value: String,
        ttl: u32,
    },
}

/// Reconciliation output for one domain
///
/// Consumed once by the zone transaction manager, and only when
/// [`changed`](UpdatePlan::changed) is true.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Domain the plan is for
    pub domain: String,
    /// Zone serving the domain
    pub zone_id: ZoneId,
    /// Complete record set the zone should hold
    pub records: Vec<LiveRecord>,
    /// Decisions that differ from the live zone, in desired-record order
    pub changes: Vec<RecordChange>,
}

impl UpdatePlan {
    /// Whether publishing this plan would change the zone
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Build the update plan for one domain
///
/// Every record type in `desired` must have an entry in `resolved`; the
/// engine resolves the union of all referenced types before reconciling
/// any domain, so a miss is reported as [`Error::MissingAddress`].
pub fn reconcile(
    domain: &str,
    zone_id: ZoneId,
    desired: &[DesiredRecord],
    resolved: &ResolvedAddresses,
    live: &[LiveRecord],
) -> Result<UpdatePlan> {
    let mut records = live.to_vec();
    let mut changes = Vec::new();

    for wanted in desired {
        let address = resolved
            .get(wanted.record_type)
            .ok_or(Error::MissingAddress(wanted.record_type))?;

        match records
            .iter_mut()
            .find(|r| r.matches(&wanted.name, wanted.record_type))
        {
            Some(existing) if existing.value == address && existing.ttl == wanted.ttl => {}
            Some(existing) => {
                changes.push(RecordChange::Update {
                    name: wanted.name.clone(),
                    record_type: wanted.record_type,
                    old_value: std::mem::replace(&mut existing.value, address.to_string()),
                    old_ttl: std::mem::replace(&mut existing.ttl, wanted.ttl),
                    new_value: address.to_string(),
                    new_ttl: wanted.ttl,
                });
            }
            None => {
                records.push(LiveRecord::new(
                    wanted.name.clone(),
                    wanted.record_type.as_str(),
                    address,
                    wanted.ttl,
                ));
                changes.push(RecordChange::Add {
                    name: wanted.name.clone(),
                    record_type: wanted.record_type,
                    value: address.to_string(),
                    ttl: wanted.ttl,
                });
            }
        }
    }

    Ok(UpdatePlan {
        domain: domain.to_string(),
        zone_id,
        records,
        changes,
    })
}
