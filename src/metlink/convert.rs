//! Conversion from raw API payloads to domain types.

use std::collections::HashSet;
use tracing::warn;

use super::api_types::{
  ApiDeparture, ApiDepartureBoard, ApiNotice, ApiRouteMap, ApiServiceNotices, ApiVehicle,
};
use super::types::{
  Departure, DepartureBoard, LatLng, MapStop, NoticeKind, RouteMap, ServiceNotice,
  VehiclePosition,
};

impl ApiDepartureBoard {
  /// Build the departure board, marking departures of favourite services.
  pub fn into_board(self, favourite_services: &HashSet<String>) -> DepartureBoard {
    let departures = self
      .services
      .into_iter()
      .map(|departure| departure.into_departure(favourite_services))
      .collect();

    DepartureBoard {
      stop_name: format!("Stop {}", self.stop.sms),
      sms: self.stop.sms,
      name: self.stop.name,
      last_modified: self.last_modified,
      departures,
    }
  }
}

impl ApiDeparture {
  fn into_departure(self, favourite_services: &HashSet<String>) -> Departure {
    let service_code = self.service.trimmed_code().to_string();
    Departure {
      is_favourite: favourite_services.contains(&service_code),
      service_id: self.service_id,
      service_code,
      service_name: self.service.name,
      mode: self.service.mode,
      direction: self.direction,
      destination: self.destination_stop_name,
      aimed_departure: self.aimed_departure,
      expected_departure: self.expected_departure,
      display_departure: self.display_departure,
      departure_status: self.departure_status,
      is_realtime: self.is_realtime,
      vehicle_ref: self.vehicle_ref,
    }
  }
}

impl ApiServiceNotices {
  /// Merge disruptions and delays into one list, disruptions first.
  pub fn into_notices(self) -> Vec<ServiceNotice> {
    let disruptions = self
      .disruptions
      .into_iter()
      .map(|n| n.into_notice(NoticeKind::Disruption));
    let delays = self
      .delays
      .into_iter()
      .map(|n| n.into_notice(NoticeKind::Delay));

    disruptions.chain(delays).collect()
  }
}

impl ApiNotice {
  fn into_notice(self, kind: NoticeKind) -> ServiceNotice {
    ServiceNotice {
      kind,
      title: self.title,
      content: self.content_plaintext,
      affected_lines: split_lines(self.affected_lines.as_deref()),
      last_modified: self.last_modified,
    }
  }
}

/// Split a comma-separated line list. Empty entries are dropped.
fn split_lines(lines: Option<&str>) -> Vec<String> {
  lines
    .map(|lines| {
      lines
        .split(',')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
    })
    .unwrap_or_default()
}

/// Parse a coordinate, logging and skipping malformed ones
fn parse_point(raw: &str) -> Option<LatLng> {
  match raw.parse::<LatLng>() {
    Ok(point) => Some(point),
    Err(e) => {
      warn!(error = %e, "Skipping malformed coordinate");
      None
    }
  }
}

impl ApiRouteMap {
  pub fn into_route_map(self) -> RouteMap {
    let stops = self
      .stop_locations
      .into_iter()
      .filter_map(|stop| {
        parse_point(&stop.lat_lng).map(|location| MapStop {
          sms: stop.sms,
          location,
        })
      })
      .collect();

    let paths = self
      .route_maps
      .into_iter()
      .map(|route| route.path.iter().filter_map(|p| parse_point(p)).collect())
      .collect();

    RouteMap {
      code: self.code,
      name: self.name,
      mode: self.mode,
      stops,
      paths,
    }
  }
}

impl ApiVehicle {
  pub fn into_position(self) -> VehiclePosition {
    let location = if self.lat.is_empty() || self.long.is_empty() {
      None
    } else {
      parse_point(&format!("{},{}", self.lat, self.long))
    };

    VehiclePosition {
      vehicle_ref: self.vehicle_ref,
      service_id: self.service_id,
      service_code: self.service.map(|s| s.trimmed_code().to_string()),
      direction: self.direction,
      origin: self.origin_stop_name,
      destination: self.destination_stop_name,
      location,
      bearing: self.bearing,
      has_started: self.has_started,
      behind_schedule: self.behind_schedule,
      delay_seconds: self.delay_seconds,
      recorded_at: self.recorded_at_time,
    }
  }
}
