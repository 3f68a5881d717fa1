//! Core traits for zonesync
//!
//! This module defines the abstract interfaces the engine drives.
//!
//! - [`AddressResolver`]: Discover the host's public address per family
//! - [`Registrar`]: Read zones and publish zone versions at the registrar

pub mod address_resolver;
pub mod registrar;

pub use address_resolver::AddressResolver;
pub use registrar::Registrar;
