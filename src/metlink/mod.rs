//! Metlink public transit API: raw payloads, domain types, HTTP client and
//! the cached facade over the stop and service lists.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
mod convert;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use cached_client::CachedMetlinkClient;
pub use client::{MetlinkClient, RemoteCatalog};
