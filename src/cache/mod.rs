//! Locally cached collections refreshed from the remote API.
//!
//! This module is independent of the transit API. It provides:
//! - `RefreshPolicy`, the TTL gate deciding between serving the local store and
//!   repopulating it
//! - Storage traits with SQLite implementations for collection rows, favourites
//!   and last-refresh timestamps
//! - A readiness gate awaited before the store is first touched

mod policy;
mod ready;
mod storage;
mod timestamps;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use policy::{is_stale, Fetcher, RefreshPolicy, DEFAULT_TTL_HOURS};
pub use ready::ReadyGate;
pub use storage::{CollectionStore, InsertReport, SqliteStore};
pub use timestamps::{SqlitePreferences, TimestampStore};
pub use traits::{CacheResult, CacheSource, CachedRow, Collection, Favourited};
