// # Address Resolver Trait
//
// Defines the interface for discovering the host's public IP address.
//
// ## Implementations
//
// - HTTP echo services: `zonesync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::{AddressResolver, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let v4 = resolver.resolve(RecordType::A).await?;
//     println!("public IPv4: {}", v4);
//
//     Ok(())
// }
// ```

use crate::record::RecordType;
use async_trait::async_trait;

/// Trait for public address discovery
///
/// The engine calls [`resolve`](AddressResolver::resolve) at most once per
/// record type per run and shares the answer across every domain, so
/// implementations do not need to cache.
///
/// # Trust Level: Untrusted
///
/// Resolvers perform their lookup and report the outcome. They must not
/// retry, spawn tasks or remember answers between calls: a stale address
/// would be published to every zone.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the public address for the family behind `record_type`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address in its canonical textual form
    /// - `Err(Error)`: If the lookup failed or returned the wrong family
    async fn resolve(&self, record_type: RecordType) -> Result<String, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
