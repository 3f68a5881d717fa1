//! Test doubles and common utilities for contract tests
//!
//! This module provides an in-memory registrar that records every call and
//! can be told to fail specific operations, plus an address resolver that
//! counts lookups.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;
use zonesync_core::error::{Error, Phase, Result};
use zonesync_core::{AddressResolver, LiveRecord, RecordType, Registrar, VersionId, ZoneId};

/// A registrar call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LookupZone(String),
    ListRecords(ZoneId),
    CreateVersion(ZoneId),
    SetRecords(ZoneId, VersionId),
    ActiveVersion(ZoneId),
    ActivateVersion(ZoneId, VersionId),
    DeleteVersion(ZoneId, VersionId),
}

impl Call {
    /// Whether this call writes to the registrar
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateVersion(_)
                | Call::SetRecords(..)
                | Call::ActivateVersion(..)
                | Call::DeleteVersion(..)
        )
    }

    /// Zone the call targets, if it is zone-scoped
    pub fn zone(&self) -> Option<ZoneId> {
        match self {
            Call::LookupZone(_) => None,
            Call::ListRecords(z)
            | Call::CreateVersion(z)
            | Call::SetRecords(z, _)
            | Call::ActiveVersion(z)
            | Call::ActivateVersion(z, _)
            | Call::DeleteVersion(z, _) => Some(*z),
        }
    }
}

/// In-memory registrar that records calls and fails on demand
pub struct RecordingRegistrar {
    zones: Mutex<HashMap<String, ZoneId>>,
    live: Mutex<HashMap<ZoneId, Vec<LiveRecord>>>,
    active: Mutex<HashMap<ZoneId, VersionId>>,
    written: Mutex<HashMap<VersionId, Vec<LiveRecord>>>,
    next_version: AtomicU64,
    draft_reported_active: AtomicBool,
    failures: Mutex<HashSet<Phase>>,
    zone_failures: Mutex<HashSet<(ZoneId, Phase)>>,
    set_records_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingRegistrar {
    pub fn new() -> Self {
        Self {
            zones: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            written: Mutex::new(HashMap::new()),
            next_version: AtomicU64::new(100),
            draft_reported_active: AtomicBool::new(false),
            failures: Mutex::new(HashSet::new()),
            zone_failures: Mutex::new(HashSet::new()),
            set_records_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve `domain` from `zone`, whose active version holds `records`
    pub fn with_zone(
        self,
        domain: &str,
        zone: ZoneId,
        active: VersionId,
        records: Vec<LiveRecord>,
    ) -> Self {
        self.zones.lock().unwrap().insert(domain.to_string(), zone);
        self.live.lock().unwrap().insert(zone, records);
        self.active.lock().unwrap().insert(zone, active);
        self
    }

    /// Fail every call of the given phase
    pub fn failing(self, phase: Phase) -> Self {
        self.failures.lock().unwrap().insert(phase);
        self
    }

    /// Fail calls of the given phase for one zone only
    pub fn failing_for(self, zone: ZoneId, phase: Phase) -> Self {
        self.zone_failures.lock().unwrap().insert((zone, phase));
        self
    }

    /// Answer active_version with the most recently created version
    pub fn reporting_draft_as_active(self) -> Self {
        self.draft_reported_active.store(true, Ordering::SeqCst);
        self
    }

    /// Hold every set_records call until the returned notifier fires
    pub fn gate_set_records(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.set_records_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Write calls made so far
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Records written to a version
    pub fn written(&self, version: VersionId) -> Option<Vec<LiveRecord>> {
        self.written.lock().unwrap().get(&version).cloned()
    }

    /// Active version of a zone
    pub fn active(&self, zone: ZoneId) -> Option<VersionId> {
        self.active.lock().unwrap().get(&zone).copied()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, zone: Option<ZoneId>, phase: Phase) -> Result<()> {
        let fails = self.failures.lock().unwrap().contains(&phase)
            || zone.is_some_and(|z| self.zone_failures.lock().unwrap().contains(&(z, phase)));
        if fails {
            return Err(Error::Other(format!("injected {} failure", phase)));
        }
        Ok(())
    }
}

#[async_trait]
impl Registrar for RecordingRegistrar {
    async fn lookup_zone(&self, domain: &str) -> Result<ZoneId> {
        self.record(Call::LookupZone(domain.to_string()));
        let zone = self.zones.lock().unwrap().get(domain).copied();
        self.check(zone, Phase::ZoneLookup)?;
        zone.ok_or_else(|| Error::Other(format!("unknown domain {}", domain)))
    }

    async fn list_records(&self, zone: ZoneId) -> Result<Vec<LiveRecord>> {
        self.record(Call::ListRecords(zone));
        self.check(Some(zone), Phase::RecordList)?;
        Ok(self.live.lock().unwrap().get(&zone).cloned().unwrap_or_default())
    }

    async fn create_version(&self, zone: ZoneId) -> Result<VersionId> {
        self.record(Call::CreateVersion(zone));
        self.check(Some(zone), Phase::VersionCreate)?;
        Ok(VersionId(self.next_version.fetch_add(1, Ordering::SeqCst)))
    }

    async fn set_records(
        &self,
        zone: ZoneId,
        version: VersionId,
        records: &[LiveRecord],
    ) -> Result<()> {
        self.record(Call::SetRecords(zone, version));
        let gate = self.set_records_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(Some(zone), Phase::RecordSet)?;
        self.written.lock().unwrap().insert(version, records.to_vec());
        Ok(())
    }

    async fn active_version(&self, zone: ZoneId) -> Result<VersionId> {
        self.record(Call::ActiveVersion(zone));
        self.check(Some(zone), Phase::ZoneInfo)?;
        if self.draft_reported_active.load(Ordering::SeqCst) {
            return Ok(VersionId(self.next_version.load(Ordering::SeqCst) - 1));
        }
        self.active
            .lock()
            .unwrap()
            .get(&zone)
            .copied()
            .ok_or_else(|| Error::Other(format!("zone {} has no active version", zone)))
    }

    async fn activate_version(&self, zone: ZoneId, version: VersionId) -> Result<()> {
        self.record(Call::ActivateVersion(zone, version));
        self.check(Some(zone), Phase::VersionActivate)?;
        self.active.lock().unwrap().insert(zone, version);
        Ok(())
    }

    async fn delete_version(&self, zone: ZoneId, version: VersionId) -> Result<()> {
        self.record(Call::DeleteVersion(zone, version));
        self.check(Some(zone), Phase::VersionDelete)?;
        self.written.lock().unwrap().remove(&version);
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "recording"
    }
}

/// Address resolver with fixed answers that counts lookups
pub struct CountingResolver {
    addresses: HashMap<RecordType, String>,
    fail: HashSet<RecordType>,
    calls: Mutex<Vec<RecordType>>,
}

impl CountingResolver {
    pub fn new() -> Self {
        Self {
            addresses: HashMap::new(),
            fail: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, record_type: RecordType, address: &str) -> Self {
        self.addresses.insert(record_type, address.to_string());
        self
    }

    pub fn failing(mut self, record_type: RecordType) -> Self {
        self.fail.insert(record_type);
        self
    }

    /// Lookups made so far
    pub fn calls(&self) -> Vec<RecordType> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressResolver for CountingResolver {
    async fn resolve(&self, record_type: RecordType) -> Result<String> {
        self.calls.lock().unwrap().push(record_type);
        if self.fail.contains(&record_type) {
            return Err(Error::http("echo service unreachable"));
        }
        self.addresses
            .get(&record_type)
            .cloned()
            .ok_or_else(|| Error::Other(format!("no {} address scripted", record_type)))
    }

    fn resolver_name(&self) -> &'static str {
        "counting"
    }
}

/// Drain every event emitted so far
pub fn drain_events(
    rx: &mut tokio::sync::mpsc::Receiver<zonesync_core::EngineEvent>,
) -> Vec<zonesync_core::EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
