use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::metlink::api_types::{
  ApiDepartureBoard, ApiRouteMap, ApiService, ApiServiceLocations, ApiServiceNotices, ApiStop,
  ApiStopList,
};

/// Remote transit API surface.
///
/// Calls carry no retry of their own; a failed collection fetch is retried the
/// next time that collection is requested.
#[async_trait]
pub trait RemoteCatalog: Send + Sync + 'static {
  /// Full stop list (`GET /StopList/`)
  async fn fetch_stops(&self) -> Result<Vec<ApiStop>>;

  /// Full service list (`GET /ServiceList/`)
  async fn fetch_services(&self) -> Result<Vec<ApiService>>;

  /// Departure board for a stop (`GET /StopDepartures/{sms}`)
  async fn fetch_departures(&self, sms: &str) -> Result<ApiDepartureBoard>;

  /// Current disruptions and delays (`GET /ServiceNotices/`)
  async fn fetch_service_notices(&self) -> Result<ApiServiceNotices>;

  /// Route geometry for one direction of a service
  async fn fetch_route_map(&self, mode: &str, code: &str, direction: &str) -> Result<ApiRouteMap>;

  /// Live vehicle positions for a service (`GET /ServiceLocation/{code}`)
  async fn fetch_vehicle_locations(&self, code: &str) -> Result<ApiServiceLocations>;
}

/// Metlink API client
#[derive(Clone)]
pub struct MetlinkClient {
  http: reqwest::Client,
  base_url: Url,
  route_map_url: Url,
}

impl MetlinkClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url: parse_base(&config.base_url)?,
      route_map_url: parse_base(&config.route_map_url)?,
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, resource: &str, url: Url) -> Result<T> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| Error::transport(resource, &e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::from_status(resource, status, &body));
    }

    let body = response
      .text()
      .await
      .map_err(|e| Error::transport(resource, &e))?;

    serde_json::from_str(&body).map_err(|e| Error::RemoteFetch {
      resource: resource.to_string(),
      status: Some(status.as_u16()),
      message: format!("Invalid response: {}", e),
    })
  }
}

#[async_trait]
impl RemoteCatalog for MetlinkClient {
  async fn fetch_stops(&self) -> Result<Vec<ApiStop>> {
    let url = endpoint(&self.base_url, &["StopList", ""])?;
    let list: ApiStopList = self.get_json("StopList", url).await?;
    Ok(list.stops)
  }

  async fn fetch_services(&self) -> Result<Vec<ApiService>> {
    let url = endpoint(&self.base_url, &["ServiceList", ""])?;
    self.get_json("ServiceList", url).await
  }

  async fn fetch_departures(&self, sms: &str) -> Result<ApiDepartureBoard> {
    let url = endpoint(&self.base_url, &["StopDepartures", sms])?;
    self.get_json("StopDepartures", url).await
  }

  async fn fetch_service_notices(&self) -> Result<ApiServiceNotices> {
    let url = endpoint(&self.base_url, &["ServiceNotices", ""])?;
    self.get_json("ServiceNotices", url).await
  }

  async fn fetch_route_map(&self, mode: &str, code: &str, direction: &str) -> Result<ApiRouteMap> {
    let url = route_map_endpoint(&self.route_map_url, mode, code, direction)?;
    self.get_json("RouteMap", url).await
  }

  async fn fetch_vehicle_locations(&self, code: &str) -> Result<ApiServiceLocations> {
    let code = code.to_uppercase();
    let url = endpoint(&self.base_url, &["ServiceLocation", code.as_str()])?;
    self.get_json("ServiceLocation", url).await
  }
}

fn parse_base(raw: &str) -> Result<Url> {
  let url = Url::parse(raw).map_err(|e| Error::Config(format!("Invalid API URL {}: {}", raw, e)))?;
  if url.cannot_be_a_base() {
    return Err(Error::Config(format!("API URL {} cannot be a base", raw)));
  }
  Ok(url)
}

/// Append path segments to a base URL. Segments are percent-encoded; a trailing
/// empty segment produces a trailing slash.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| Error::Config(format!("API URL {} cannot be a base", base)))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

/// `{mode}/{CODE}/{direction}/mapdatajson`, with mode and direction lower-cased
fn route_map_endpoint(base: &Url, mode: &str, code: &str, direction: &str) -> Result<Url> {
  let mode = mode.to_lowercase();
  let code = code.to_uppercase();
  let direction = direction.to_lowercase();
  endpoint(
    base,
    &[mode.as_str(), code.as_str(), direction.as_str(), "mapdatajson"],
  )
}
