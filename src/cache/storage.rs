//! Collection storage trait and SQLite implementation.

use rusqlite::{params, params_from_iter};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::{CachedRow, Favourited};
use crate::db::Database;
use crate::error::{Error, Result};

/// Outcome of a best-effort bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
  /// Rows persisted
  pub inserted: usize,
  /// Per-row failures, already logged
  pub failures: Vec<Error>,
}

impl InsertReport {
  pub fn failed(&self) -> usize {
    self.failures.len()
  }
}

/// Trait for collection storage backends.
pub trait CollectionStore: Send + Sync {
  /// Remove every cached row of a collection. Favourites are left alone.
  fn clear<T: CachedRow>(&self) -> Result<()>;

  /// Insert rows one by one. A failing row is logged and skipped.
  fn insert_all<T: CachedRow>(&self, rows: &[T]) -> Result<InsertReport>;

  /// Read the collection left-joined with its favourites, in collection order.
  fn read_with_favourites<T: CachedRow>(&self) -> Result<Vec<Favourited<T>>>;

  /// Keys currently marked as favourites for a collection.
  fn favourite_keys<T: CachedRow>(&self) -> Result<HashSet<String>>;
}

/// SQLite-based collection storage.
#[derive(Clone)]
pub struct SqliteStore {
  db: Arc<Database>,
}

impl SqliteStore {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  /// Mark a key as a favourite. Marking an existing favourite is a no-op.
  pub fn mark_favourite<T: CachedRow>(&self, key: &str) -> Result<()> {
    let conn = self.db.conn()?;
    conn
      .execute(
        &format!(
          "INSERT OR IGNORE INTO {} ({}) VALUES (?)",
          T::FAVOURITES,
          T::KEY_COLUMN
        ),
        params![key],
      )
      .map_err(|e| Error::Store(format!("Failed to mark favourite {}: {}", key, e)))?;
    Ok(())
  }

  /// Remove a favourite mark. Returns whether the key was marked.
  pub fn unmark_favourite<T: CachedRow>(&self, key: &str) -> Result<bool> {
    let conn = self.db.conn()?;
    let removed = conn
      .execute(
        &format!("DELETE FROM {} WHERE {} = ?", T::FAVOURITES, T::KEY_COLUMN),
        params![key],
      )
      .map_err(|e| Error::Store(format!("Failed to unmark favourite {}: {}", key, e)))?;
    Ok(removed > 0)
  }
}

impl CollectionStore for SqliteStore {
  fn clear<T: CachedRow>(&self) -> Result<()> {
    let conn = self.db.conn()?;
    let removed = conn
      .execute(&format!("DELETE FROM {}", T::COLLECTION), [])
      .map_err(|e| Error::Store(format!("Failed to clear {}: {}", T::COLLECTION, e)))?;

    debug!(collection = T::COLLECTION, removed, "Cleared collection");
    Ok(())
  }

  fn insert_all<T: CachedRow>(&self, rows: &[T]) -> Result<InsertReport> {
    let mut conn = self.db.conn()?;
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      T::COLLECTION,
      T::COLUMNS.join(", "),
      vec!["?"; T::COLUMNS.len()].join(", ")
    );

    let tx = conn
      .transaction()
      .map_err(|e| Error::Store(format!("Failed to begin transaction: {}", e)))?;
    let mut report = InsertReport::default();

    {
      let mut stmt = tx
        .prepare(&sql)
        .map_err(|e| Error::Store(format!("Failed to prepare insert: {}", e)))?;

      for row in rows {
        match stmt.execute(params_from_iter(row.to_params())) {
          Ok(_) => report.inserted += 1,
          Err(e) => {
            let err = Error::RowInsert {
              collection: T::COLLECTION,
              key: row.cache_key().to_string(),
              message: e.to_string(),
            };
            warn!(collection = T::COLLECTION, key = row.cache_key(), error = %e, "INSERT error");
            report.failures.push(err);
          }
        }
      }
    }

    tx.commit()
      .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

    Ok(report)
  }

  fn read_with_favourites<T: CachedRow>(&self) -> Result<Vec<Favourited<T>>> {
    let conn = self.db.conn()?;
    let columns = T::COLUMNS
      .iter()
      .map(|c| format!("s.{}", c))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "SELECT {columns}, f.{key} IS NOT NULL FROM {table} AS s
       LEFT JOIN {favourites} AS f ON s.{key} = f.{key}
       ORDER BY {order}",
      columns = columns,
      key = T::KEY_COLUMN,
      table = T::COLLECTION,
      favourites = T::FAVOURITES,
      order = T::ORDER_BY,
    );

    let mut stmt = conn
      .prepare(&sql)
      .map_err(|e| Error::Store(format!("Failed to prepare {} query: {}", T::COLLECTION, e)))?;

    let rows = stmt
      .query_map([], |row| {
        Ok(Favourited {
          item: T::from_row(row)?,
          is_favourite: row.get(T::COLUMNS.len())?,
        })
      })
      .map_err(|e| Error::Store(format!("SELECT error: {}", e)))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| Error::Store(format!("SELECT error: {}", e)))?;

    Ok(rows)
  }

  fn favourite_keys<T: CachedRow>(&self) -> Result<HashSet<String>> {
    let conn = self.db.conn()?;
    let mut stmt = conn
      .prepare(&format!("SELECT {} FROM {}", T::KEY_COLUMN, T::FAVOURITES))
      .map_err(|e| Error::Store(format!("Failed to prepare favourites query: {}", e)))?;

    let keys = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| Error::Store(format!("Failed to query favourites: {}", e)))?
      .collect::<rusqlite::Result<HashSet<String>>>()
      .map_err(|e| Error::Store(format!("Failed to query favourites: {}", e)))?;

    Ok(keys)
  }
}
