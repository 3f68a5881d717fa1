// # zonesync-core
//
// Core library for keeping registrar-hosted DNS zones in sync with the
// host's public IP addresses.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for discovering the public address per family
// - **Registrar**: Trait for reading zones and publishing zone versions
// - **reconcile**: Pure diff of desired records against live records
// - **ZoneTransaction**: Versioned publish with compensating rollback
// - **SyncEngine**: Orchestrates one run across every configured domain
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from registrar and lookup implementations
// 2. **Run-to-completion**: One invocation, one pass; scheduling belongs to an external timer
// 3. **Library-First**: All core functionality can be used as a library
// 4. **No leaked drafts**: A draft zone version never outlives a failed transaction

pub mod addresses;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod traits;
pub mod transaction;

// Re-export core types for convenience
pub use config::{DesiredState, DomainRecords, EngineConfig, IpSourceConfig, SyncConfig};
pub use engine::{DomainOutcome, DomainStatus, EngineEvent, RunReport, SyncEngine};
pub use error::{Error, Phase, Result};
pub use reconcile::{RecordChange, UpdatePlan, reconcile};
pub use record::{DesiredRecord, LiveRecord, RecordType, ResolvedAddresses, VersionId, ZoneId};
pub use traits::{AddressResolver, Registrar};
pub use transaction::{PublishOutcome, ZoneTransaction};
