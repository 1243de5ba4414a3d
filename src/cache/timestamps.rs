//! Last-refresh timestamps kept in the preference table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

use crate::db::Database;
use crate::error::{Error, Result};

/// Trait for the key-value store holding last-refresh instants.
pub trait TimestampStore: Send + Sync {
  /// Read the instant stored under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>>;

  /// Record `at` under `key`, replacing any previous value.
  fn set(&self, key: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Preferences backed by the `Preferences` table.
#[derive(Clone)]
pub struct SqlitePreferences {
  db: Arc<Database>,
}

impl SqlitePreferences {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  /// Remove a stored value, forcing the next read to see it as absent.
  pub fn remove(&self, key: &str) -> Result<()> {
    let conn = self.db.conn()?;
    conn
      .execute("DELETE FROM Preferences WHERE Key = ?", params![key])
      .map_err(|e| Error::Store(format!("Failed to remove preference {}: {}", key, e)))?;
    Ok(())
  }

  fn get_raw(&self, key: &str) -> Result<Option<String>> {
    let conn = self.db.conn().map_err(|e| Error::PreferenceRead {
      key: key.to_string(),
      message: e.to_string(),
    })?;

    conn
      .query_row(
        "SELECT Value FROM Preferences WHERE Key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| Error::PreferenceRead {
        key: key.to_string(),
        message: e.to_string(),
      })
  }
}

impl TimestampStore for SqlitePreferences {
  fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = self.get_raw(key)? else {
      return Ok(None);
    };

    DateTime::parse_from_rfc3339(&value)
      .map(|dt| Some(dt.with_timezone(&Utc)))
      .map_err(|e| Error::PreferenceRead {
        key: key.to_string(),
        message: format!("invalid timestamp '{}': {}", value, e),
      })
  }

  fn set(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
    let conn = self.db.conn()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO Preferences (Key, Value) VALUES (?, ?)",
        params![key, at.to_rfc3339()],
      )
      .map_err(|e| Error::Store(format!("Failed to store preference {}: {}", key, e)))?;
    Ok(())
  }
}
