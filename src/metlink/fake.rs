//! In-memory remote catalog for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::api_types::{
  ApiDepartureBoard, ApiRouteMap, ApiService, ApiServiceLocations, ApiServiceNotices, ApiStop,
};
use super::client::RemoteCatalog;
use crate::error::{Error, Result};

pub struct FakeRemote {
  pub stops: Vec<ApiStop>,
  pub services: Vec<ApiService>,
  stop_fetches: AtomicUsize,
  service_fetches: AtomicUsize,
  offline: AtomicBool,
}

impl FakeRemote {
  pub fn new(stops: Vec<ApiStop>, services: Vec<ApiService>) -> Self {
    Self {
      stops,
      services,
      stop_fetches: AtomicUsize::new(0),
      service_fetches: AtomicUsize::new(0),
      offline: AtomicBool::new(false),
    }
  }

  pub fn stop_fetches(&self) -> usize {
    self.stop_fetches.load(Ordering::SeqCst)
  }

  pub fn service_fetches(&self) -> usize {
    self.service_fetches.load(Ordering::SeqCst)
  }

  /// Make every subsequent call fail as if the network were down.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  fn check(&self, resource: &str) -> Result<()> {
    if self.offline.load(Ordering::SeqCst) {
      return Err(Error::RemoteFetch {
        resource: resource.to_string(),
        status: None,
        message: "Network unreachable".to_string(),
      });
    }
    Ok(())
  }
}

pub fn api_stop(sms: &str, name: &str) -> ApiStop {
  ApiStop {
    name: name.to_string(),
    sms: sms.to_string(),
    farezone: "1".to_string(),
    lat: "-41.28".to_string(),
    long: "174.77".to_string(),
    last_modified: "2019-04-16T00:00:31+12:00".to_string(),
  }
}

pub fn api_service(code: &str, trimmed: &str, mode: &str) -> ApiService {
  ApiService {
    code: code.to_string(),
    name: format!("Route {}", code),
    mode: mode.to_string(),
    last_modified: "2019-02-22T10:43:01+13:00".to_string(),
    trimmed_code: Some(trimmed.to_string()),
    link: None,
    alias_names: None,
  }
}

fn parse<T: serde::de::DeserializeOwned>(json: serde_json::Value) -> Result<T> {
  serde_json::from_value(json).map_err(|e| Error::RemoteFetch {
    resource: "fake".to_string(),
    status: None,
    message: e.to_string(),
  })
}

#[async_trait]
impl RemoteCatalog for FakeRemote {
  async fn fetch_stops(&self) -> Result<Vec<ApiStop>> {
    self.stop_fetches.fetch_add(1, Ordering::SeqCst);
    self.check("StopList")?;
    Ok(self.stops.clone())
  }

  async fn fetch_services(&self) -> Result<Vec<ApiService>> {
    self.service_fetches.fetch_add(1, Ordering::SeqCst);
    self.check("ServiceList")?;
    Ok(self.services.clone())
  }

  async fn fetch_departures(&self, sms: &str) -> Result<ApiDepartureBoard> {
    self.check("StopDepartures")?;
    parse(serde_json::json!({
      "LastModified": "2024-03-15T10:00:00+13:00",
      "Stop": {"Name": "Test Stop", "Sms": sms},
      "Services": self.services.iter().map(|s| serde_json::json!({
        "ServiceID": s.code,
        "IsRealtime": false,
        "Service": {"Code": s.code, "TrimmedCode": s.trimmed_code, "Name": s.name, "Mode": s.mode}
      })).collect::<Vec<_>>()
    }))
  }

  async fn fetch_service_notices(&self) -> Result<ApiServiceNotices> {
    self.check("ServiceNotices")?;
    parse(serde_json::json!({
      "Disruptions": [{"Title": "Road works", "AffectedLines": "1,2"}],
      "Delays": [{"Title": "Late running", "AffectedLines": "60"}]
    }))
  }

  async fn fetch_route_map(&self, mode: &str, code: &str, direction: &str) -> Result<ApiRouteMap> {
    self.check("RouteMap")?;
    parse(serde_json::json!({
      "Code": code,
      "Name": format!("{} {}", code, direction),
      "Mode": mode,
      "StopLocations": [{"Sms": "5006", "LatLng": "-41.28,174.77"}],
      "RouteMaps": [{"Path": ["-41.28,174.77,0", "-41.29,174.78,0"]}]
    }))
  }

  async fn fetch_vehicle_locations(&self, code: &str) -> Result<ApiServiceLocations> {
    self.check("ServiceLocation")?;
    parse(serde_json::json!({
      "Services": [{
        "VehicleRef": "2301",
        "ServiceID": code,
        "Lat": -41.31,
        "Long": 174.77,
        "Service": {"Code": code, "Name": "Test", "Mode": "Bus"}
      }]
    }))
  }
}
