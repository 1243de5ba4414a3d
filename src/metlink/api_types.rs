//! Serde-deserializable types matching Metlink API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Accept a JSON string or number and keep its textual form.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    Value::Null => Ok(String::new()),
    other => Err(serde::de::Error::custom(format!(
      "expected a string or number, got {}",
      other
    ))),
  }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  string_or_number(deserializer).map(|s| if s.is_empty() { None } else { Some(s) })
}

// ============================================================================
// Stop list
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiStopList {
  #[serde(default)]
  pub last_modified: Option<String>,
  #[serde(default)]
  pub stops: Vec<ApiStop>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ApiStop {
  #[serde(default, deserialize_with = "string_or_number")]
  pub name: String,
  #[serde(deserialize_with = "string_or_number")]
  pub sms: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub farezone: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub lat: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub long: String,
  #[serde(default)]
  pub last_modified: String,
}

// ============================================================================
// Service list
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ApiService {
  #[serde(deserialize_with = "string_or_number")]
  pub code: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub name: String,
  #[serde(default)]
  pub mode: String,
  #[serde(default)]
  pub last_modified: String,
  #[serde(default, deserialize_with = "optional_string_or_number")]
  pub trimmed_code: Option<String>,
  #[serde(default)]
  pub link: Option<String>,
  #[serde(default)]
  pub alias_names: Option<String>,
}

impl ApiService {
  /// Canonical parent code. Falls back to the raw code when the API omits it.
  pub fn trimmed_code(&self) -> &str {
    match self.trimmed_code.as_deref() {
      Some(trimmed) if !trimmed.is_empty() => trimmed,
      _ => &self.code,
    }
  }
}

// ============================================================================
// Stop departures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiDepartureBoard {
  #[serde(default)]
  pub last_modified: Option<String>,
  pub stop: ApiDepartureStop,
  #[serde(default)]
  pub services: Vec<ApiDeparture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiDepartureStop {
  pub name: String,
  #[serde(deserialize_with = "string_or_number")]
  pub sms: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub farezone: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub lat: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub long: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiDeparture {
  #[serde(rename = "ServiceID", default)]
  pub service_id: String,
  #[serde(default)]
  pub is_realtime: bool,
  #[serde(default)]
  pub vehicle_ref: Option<String>,
  #[serde(default)]
  pub direction: Option<String>,
  #[serde(default)]
  pub destination_stop_name: Option<String>,
  #[serde(default)]
  pub aimed_departure: Option<String>,
  #[serde(default)]
  pub expected_departure: Option<String>,
  #[serde(default)]
  pub display_departure: Option<String>,
  #[serde(default)]
  pub departure_status: Option<String>,
  pub service: ApiServiceRef,
}

/// Service summary embedded in departures and vehicle positions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiServiceRef {
  #[serde(deserialize_with = "string_or_number")]
  pub code: String,
  #[serde(default, deserialize_with = "optional_string_or_number")]
  pub trimmed_code: Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub mode: String,
}

impl ApiServiceRef {
  pub fn trimmed_code(&self) -> &str {
    match self.trimmed_code.as_deref() {
      Some(trimmed) if !trimmed.is_empty() => trimmed,
      _ => &self.code,
    }
  }
}

// ============================================================================
// Service notices
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiServiceNotices {
  #[serde(default)]
  pub last_modified: Option<String>,
  #[serde(default)]
  pub disruptions: Vec<ApiNotice>,
  #[serde(default)]
  pub delays: Vec<ApiNotice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiNotice {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(rename = "Content_Plaintext", default)]
  pub content_plaintext: Option<String>,
  #[serde(default)]
  pub affected_lines: Option<String>,
  #[serde(default)]
  pub last_modified: Option<String>,
  // Catch-all for fields that vary between notice kinds
  #[serde(flatten)]
  pub extra: HashMap<String, Value>,
}

// ============================================================================
// Route maps
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiRouteMap {
  #[serde(default, deserialize_with = "string_or_number")]
  pub code: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub mode: String,
  #[serde(default)]
  pub last_modified: Option<String>,
  #[serde(default)]
  pub stop_locations: Vec<ApiMapStop>,
  #[serde(default)]
  pub route_maps: Vec<ApiRoutePath>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiMapStop {
  #[serde(deserialize_with = "string_or_number")]
  pub sms: String,
  #[serde(rename = "LatLng")]
  pub lat_lng: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiRoutePath {
  #[serde(default)]
  pub path: Vec<String>,
}

// ============================================================================
// Vehicle locations
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiServiceLocations {
  #[serde(default)]
  pub last_modified: Option<String>,
  #[serde(default)]
  pub services: Vec<ApiVehicle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiVehicle {
  #[serde(default)]
  pub recorded_at_time: Option<String>,
  #[serde(default)]
  pub vehicle_ref: Option<String>,
  #[serde(rename = "ServiceID", default)]
  pub service_id: Option<String>,
  #[serde(default)]
  pub has_started: bool,
  #[serde(default)]
  pub origin_stop_name: Option<String>,
  #[serde(default)]
  pub destination_stop_name: Option<String>,
  #[serde(default)]
  pub direction: Option<String>,
  #[serde(default, deserialize_with = "optional_string_or_number")]
  pub bearing: Option<String>,
  #[serde(default)]
  pub behind_schedule: bool,
  #[serde(default)]
  pub delay_seconds: Option<i64>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub lat: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub long: String,
  pub service: Option<ApiServiceRef>,
}
