//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Trait for rows that live in a cached collection table.
///
/// Implementors describe the table they are persisted in, the favourites table
/// joined against it, and how to bind and read their columns.
pub trait CachedRow: Clone + Send + Sync + Serialize + 'static {
  /// Collection table name (e.g., "Stops")
  const COLLECTION: &'static str;

  /// Favourites table joined by key (e.g., "FavouriteStops")
  const FAVOURITES: &'static str;

  /// Key column shared by the collection and favourites tables
  const KEY_COLUMN: &'static str;

  /// Persisted columns, in the order used by `to_params` and `from_row`
  const COLUMNS: &'static [&'static str];

  /// ORDER BY clause for reads, using `s` as the collection alias
  const ORDER_BY: &'static str;

  /// Unique key of this row within its collection
  fn cache_key(&self) -> &str;

  /// Column values in `COLUMNS` order
  fn to_params(&self) -> Vec<rusqlite::types::Value>;

  /// Rebuild a row from the first `COLUMNS.len()` columns of a result row
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;
}

/// A cached collection that is refreshed as a whole from the remote API.
pub trait Collection: Send + Sync + 'static {
  /// Record as returned by the remote API
  type Raw: Send + 'static;

  /// Row persisted in the local store
  type Row: CachedRow;

  /// Preference key holding the last successful refresh instant
  const LAST_UPDATED_KEY: &'static str;

  /// Normalise and filter raw records into persistable rows.
  fn transform(raw: Vec<Self::Raw>) -> Vec<Self::Row>;

  /// Collection name used in logs and errors
  fn name() -> &'static str {
    Self::Row::COLLECTION
  }
}

/// A cached row annotated with whether the user marked it as a favourite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Favourited<T> {
  #[serde(flatten)]
  pub item: T,
  #[serde(rename = "IsFavourite")]
  pub is_favourite: bool,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the collection was last repopulated
  pub refreshed_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  /// Data served from the local store without contacting the network.
  pub fn from_store(data: T, refreshed_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Store,
      refreshed_at,
    }
  }

  /// Data read back after a repopulation from the network.
  pub fn from_network(data: T, refreshed_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      refreshed_at,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      refreshed_at: self.refreshed_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh rows already in the local store
  Store,
  /// The collection was repopulated from the network for this call
  Network,
}
