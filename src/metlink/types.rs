use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cached stop row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stop {
  pub sms: String,
  pub name: String,
  pub full_name: String,
  pub farezone: String,
  pub lat: String,
  pub long: String,
  pub last_modified: String,
}

/// Cached service row, keyed by trimmed code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
  pub code: String,
  pub name: String,
  pub mode: ServiceMode,
  pub last_modified: String,
}

/// Transit mode of a cached service. Rare modes collapse into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceMode {
  Bus,
  Train,
  School,
  Other,
}

impl ServiceMode {
  /// Coerce an API mode string. Anything but an exact known mode is `Other`.
  pub fn from_api(mode: &str) -> Self {
    match mode {
      "Bus" => ServiceMode::Bus,
      "Train" => ServiceMode::Train,
      "School" => ServiceMode::School,
      _ => ServiceMode::Other,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ServiceMode::Bus => "Bus",
      ServiceMode::Train => "Train",
      ServiceMode::School => "School",
      ServiceMode::Other => "Other",
    }
  }
}

impl fmt::Display for ServiceMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Departure board for a stop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DepartureBoard {
  pub sms: String,
  pub name: String,
  /// "Stop <sms>"
  pub stop_name: String,
  pub last_modified: Option<String>,
  pub departures: Vec<Departure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Departure {
  pub service_id: String,
  /// Trimmed code of the departing service
  pub service_code: String,
  pub service_name: String,
  pub mode: String,
  pub direction: Option<String>,
  pub destination: Option<String>,
  pub aimed_departure: Option<String>,
  pub expected_departure: Option<String>,
  pub display_departure: Option<String>,
  pub departure_status: Option<String>,
  pub is_realtime: bool,
  pub vehicle_ref: Option<String>,
  pub is_favourite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
  Disruption,
  Delay,
}

/// Disruption or delay notice
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceNotice {
  pub kind: NoticeKind,
  pub title: Option<String>,
  pub content: Option<String>,
  pub affected_lines: Vec<String>,
  pub last_modified: Option<String>,
}

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
  pub lat: f64,
  pub long: f64,
}

impl FromStr for LatLng {
  type Err = String;

  /// Parse "lat,long" with an optional trailing altitude ("lat,long,0").
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut parts = s.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
      (Some(lat), Some(long), _, None) => {
        let lat = lat
          .parse::<f64>()
          .map_err(|e| format!("invalid latitude '{}': {}", lat, e))?;
        let long = long
          .parse::<f64>()
          .map_err(|e| format!("invalid longitude '{}': {}", long, e))?;
        Ok(LatLng { lat, long })
      }
      _ => Err(format!("coordinate not in 'lat,long' form: '{}'", s)),
    }
  }
}

/// Route geometry for one direction of a service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteMap {
  pub code: String,
  pub name: String,
  pub mode: String,
  pub stops: Vec<MapStop>,
  pub paths: Vec<Vec<LatLng>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapStop {
  pub sms: String,
  pub location: LatLng,
}

/// Live position of a vehicle running a service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehiclePosition {
  pub vehicle_ref: Option<String>,
  pub service_id: Option<String>,
  pub service_code: Option<String>,
  pub direction: Option<String>,
  pub origin: Option<String>,
  pub destination: Option<String>,
  pub location: Option<LatLng>,
  pub bearing: Option<String>,
  pub has_started: bool,
  pub behind_schedule: bool,
  pub delay_seconds: Option<i64>,
  pub recorded_at: Option<String>,
}
