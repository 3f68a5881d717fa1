//! Address resolution for a run
//!
//! Wraps an [`AddressResolver`] so that each distinct record type is
//! resolved exactly once per run, whatever the number of domains and
//! records referring to it.

use crate::error::{Error, Result};
use crate::record::{RecordType, ResolvedAddresses};
use crate::traits::AddressResolver;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use tracing::debug;

/// Resolve the public address for every record type in `record_types`
///
/// Lookups run concurrently. Any failure fails the whole set: a domain
/// may reference the family that could not be resolved.
pub async fn resolve_addresses(
    resolver: &dyn AddressResolver,
    record_types: &BTreeSet<RecordType>,
) -> Result<ResolvedAddresses> {
    debug!(
        "Resolving public addresses for {:?} via {}",
        record_types,
        resolver.resolver_name()
    );

    let lookups = record_types.iter().map(|&record_type| async move {
        let address = resolver
            .resolve(record_type)
            .await
            .map_err(|e| match e {
                Error::Resolution { .. } => e,
                other => Error::resolution(record_type, other.to_string()),
            })?;
        Ok::<_, Error>((record_type, address))
    });

    Ok(try_join_all(lookups).await?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        calls: Mutex<Vec<RecordType>>,
        fail_v6: bool,
    }

    #[async_trait]
    impl AddressResolver for Scripted {
        async fn resolve(&self, record_type: RecordType) -> Result<String> {
            self.calls.lock().unwrap().push(record_type);
            match record_type {
                RecordType::A => Ok("203.0.113.7".to_string()),
                RecordType::Aaaa if self.fail_v6 => Err(Error::http("no route to host")),
                RecordType::Aaaa => Ok("2001:db8::7".to_string()),
            }
        }

        fn resolver_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn resolves_each_requested_type_once() {
        let resolver = Scripted {
            calls: Mutex::new(Vec::new()),
            fail_v6: false,
        };
        let types = BTreeSet::from([RecordType::A, RecordType::Aaaa]);

        let resolved = resolve_addresses(&resolver, &types).await.unwrap();

        assert_eq!(resolved.get(RecordType::A), Some("203.0.113.7"));
        assert_eq!(resolved.get(RecordType::Aaaa), Some("2001:db8::7"));
        let mut calls = resolver.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, [RecordType::A, RecordType::Aaaa]);
    }

    #[tokio::test]
    async fn only_requested_types_are_resolved() {
        let resolver = Scripted {
            calls: Mutex::new(Vec::new()),
            fail_v6: true,
        };
        let types = BTreeSet::from([RecordType::A]);

        let resolved = resolve_addresses(&resolver, &types).await.unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(*resolver.calls.lock().unwrap(), [RecordType::A]);
    }

    #[tokio::test]
    async fn any_failure_is_a_resolution_error() {
        let resolver = Scripted {
            calls: Mutex::new(Vec::new()),
            fail_v6: true,
        };
        let types = BTreeSet::from([RecordType::A, RecordType::Aaaa]);

        let err = resolve_addresses(&resolver, &types).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution {
                record_type: RecordType::Aaaa,
                ..
            }
        ));
    }
}
