// # Registrar Trait
//
// Defines the interface to a registrar that publishes zones as numbered
// versions: a new version is created as a draft, populated, then made
// active in a single switch.
//
// ## Implementations
//
// - Gandi XML-RPC: `zonesync-registrar-gandi` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::Registrar;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let registrar = /* Registrar implementation */;
//
//     let zone = registrar.lookup_zone("example.com").await?;
//     let records = registrar.list_records(zone).await?;
//     println!("{} records in zone {}", records.len(), zone);
//
//     Ok(())
// }
// ```

use crate::record::{LiveRecord, VersionId, ZoneId};
use async_trait::async_trait;

/// Trait for registrar implementations
///
/// One method per registrar operation. Each call is a single request;
/// the core tags failures with the phase they happened in, so
/// implementations return plain errors.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - Perform requests against the registrar endpoint only
/// - Parse registrar-specific responses
///
/// ## Forbidden Capabilities
/// - Retry or back off (transport policy, not core policy)
/// - Decide whether a zone needs publishing (owned by the reconciler)
/// - Roll back on its own (owned by the zone transaction manager)
/// - Log credentials
#[async_trait]
pub trait Registrar: Send + Sync {
    /// zone.lookup: find the zone serving `domain`
    async fn lookup_zone(&self, domain: &str) -> Result<ZoneId, crate::Error>;

    /// record.list: records of the zone's active version, in registrar order
    async fn list_records(&self, zone: ZoneId) -> Result<Vec<LiveRecord>, crate::Error>;

    /// version.create: create a new draft version of the zone
    async fn create_version(&self, zone: ZoneId) -> Result<VersionId, crate::Error>;

    /// version.setRecords: replace the full record set of a draft version
    async fn set_records(
        &self,
        zone: ZoneId,
        version: VersionId,
        records: &[LiveRecord],
    ) -> Result<(), crate::Error>;

    /// zone.info: the zone's currently active version
    async fn active_version(&self, zone: ZoneId) -> Result<VersionId, crate::Error>;

    /// version.activate: make `version` the zone's active version
    async fn activate_version(&self, zone: ZoneId, version: VersionId)
    -> Result<(), crate::Error>;

    /// version.delete: delete a non-active version
    async fn delete_version(&self, zone: ZoneId, version: VersionId) -> Result<(), crate::Error>;

    /// Get the registrar name (for logging/debugging)
    fn registrar_name(&self) -> &'static str;
}
