//! Cached collection definitions for Metlink stops and services.

use rusqlite::types::Value;
use tracing::debug;

use crate::cache::{CachedRow, Collection};

use super::api_types::{ApiService, ApiStop};
use super::types::{Service, ServiceMode, Stop};

/// Stop codes longer than this denote child stops (e.g. "WOBU1")
const MAX_PARENT_SMS_LEN: usize = 4;

// ============================================================================
// Collections
// ============================================================================

/// The cached stop list
pub struct Stops;

impl Collection for Stops {
  type Raw = ApiStop;
  type Row = Stop;

  const LAST_UPDATED_KEY: &'static str = "StopDataLastUpdated";

  fn transform(raw: Vec<ApiStop>) -> Vec<Stop> {
    raw
      .into_iter()
      .filter(|stop| {
        let parent = stop.sms.chars().count() <= MAX_PARENT_SMS_LEN;
        if !parent {
          debug!(sms = %stop.sms, "Skipping child stop");
        }
        parent
      })
      .map(|stop| Stop {
        full_name: format!("Stop {} - {}", stop.sms, stop.name),
        sms: stop.sms,
        name: stop.name,
        farezone: stop.farezone,
        lat: stop.lat,
        long: stop.long,
        last_modified: stop.last_modified,
      })
      .collect()
  }
}

/// The cached service list
pub struct Services;

impl Collection for Services {
  type Raw = ApiService;
  type Row = Service;

  const LAST_UPDATED_KEY: &'static str = "ServicesDataLastUpdated";

  fn transform(raw: Vec<ApiService>) -> Vec<Service> {
    raw
      .into_iter()
      .map(|service| Service {
        code: service.trimmed_code().to_string(),
        mode: ServiceMode::from_api(&service.mode),
        name: service.name,
        last_modified: service.last_modified,
      })
      .collect()
  }
}

// ============================================================================
// Row mappings
// ============================================================================

fn text(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
  Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

impl CachedRow for Stop {
  const COLLECTION: &'static str = "Stops";
  const FAVOURITES: &'static str = "FavouriteStops";
  const KEY_COLUMN: &'static str = "Sms";
  const COLUMNS: &'static [&'static str] = &[
    "Sms",
    "Name",
    "FullName",
    "Farezone",
    "Lat",
    "Long",
    "LastModified",
  ];
  const ORDER_BY: &'static str = "CAST(s.Sms AS INTEGER) ASC, s.Sms ASC";

  fn cache_key(&self) -> &str {
    &self.sms
  }

  fn to_params(&self) -> Vec<Value> {
    vec![
      Value::Text(self.sms.clone()),
      Value::Text(self.name.clone()),
      Value::Text(self.full_name.clone()),
      Value::Text(self.farezone.clone()),
      Value::Text(self.lat.clone()),
      Value::Text(self.long.clone()),
      Value::Text(self.last_modified.clone()),
    ]
  }

  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Stop {
      sms: row.get(0)?,
      name: row.get(1)?,
      full_name: row.get(2)?,
      farezone: text(row, 3)?,
      lat: text(row, 4)?,
      long: text(row, 5)?,
      last_modified: text(row, 6)?,
    })
  }
}

impl CachedRow for Service {
  const COLLECTION: &'static str = "Services";
  const FAVOURITES: &'static str = "FavouriteServices";
  const KEY_COLUMN: &'static str = "Code";
  const COLUMNS: &'static [&'static str] = &["Code", "Name", "Mode", "LastModified"];
  const ORDER_BY: &'static str = "s.rowid ASC";

  fn cache_key(&self) -> &str {
    &self.code
  }

  fn to_params(&self) -> Vec<Value> {
    vec![
      Value::Text(self.code.clone()),
      Value::Text(self.name.clone()),
      Value::Text(self.mode.as_str().to_string()),
      Value::Text(self.last_modified.clone()),
    ]
  }

  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let mode: String = row.get(2)?;
    Ok(Service {
      code: row.get(0)?,
      name: row.get(1)?,
      mode: ServiceMode::from_api(&mode),
      last_modified: text(row, 3)?,
    })
  }
}
