//! Cached Metlink client that wraps a remote catalog with the collection cache.

use chrono::Duration;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{
  CacheResult, CollectionStore, Favourited, Fetcher, ReadyGate, RefreshPolicy, SqlitePreferences,
  SqliteStore, TimestampStore,
};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};

use super::cache::{Services, Stops};
use super::client::{MetlinkClient, RemoteCatalog};
use super::types::{DepartureBoard, RouteMap, Service, ServiceNotice, Stop, VehiclePosition};

/// Metlink client with transparent caching of the stop and service lists.
///
/// Stops and services go through their refresh policies; departures, notices,
/// route maps and vehicle positions are live and always fetched.
pub struct CachedMetlinkClient<R, S = SqliteStore, P = SqlitePreferences> {
  remote: Arc<R>,
  store: Arc<S>,
  timestamps: Arc<P>,
  ready: ReadyGate,
  stops: RefreshPolicy<Stops, S, P>,
  services: RefreshPolicy<Services, S, P>,
}

impl CachedMetlinkClient<MetlinkClient> {
  /// Open the HTTP client and the SQLite cache described by `config`.
  pub fn open(config: &Config) -> Result<Self> {
    let ttl = Duration::try_hours(config.cache.ttl_hours).ok_or_else(|| {
      Error::Config(format!(
        "Cache TTL of {} hours is out of range",
        config.cache.ttl_hours
      ))
    })?;
    let remote = Arc::new(MetlinkClient::new(&config.api)?);

    let path = match &config.cache.database {
      Some(path) => path.clone(),
      None => Database::default_path()?,
    };
    let db = Arc::new(Database::open(&path)?);
    debug!(path = %path.display(), "Opened cache database");

    Ok(Self::new(
      remote,
      Arc::new(SqliteStore::new(db.clone())),
      Arc::new(SqlitePreferences::new(db)),
      ReadyGate::opened(),
      ttl,
    ))
  }
}

impl<R, S, P> CachedMetlinkClient<R, S, P>
where
  R: RemoteCatalog,
  S: CollectionStore + 'static,
  P: TimestampStore + 'static,
{
  pub fn new(
    remote: Arc<R>,
    store: Arc<S>,
    timestamps: Arc<P>,
    ready: ReadyGate,
    ttl: Duration,
  ) -> Self {
    let stops = RefreshPolicy::new(
      store.clone(),
      timestamps.clone(),
      ready.clone(),
      stop_fetcher(remote.clone()),
    )
    .with_ttl(ttl);
    let services = RefreshPolicy::new(
      store.clone(),
      timestamps.clone(),
      ready.clone(),
      service_fetcher(remote.clone()),
    )
    .with_ttl(ttl);

    Self {
      remote,
      store,
      timestamps,
      ready,
      stops,
      services,
    }
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub fn timestamps(&self) -> &Arc<P> {
    &self.timestamps
  }

  /// All parent stops ordered by numeric stop code, with favourite flags.
  pub async fn stops(&self) -> Result<CacheResult<Vec<Favourited<Stop>>>> {
    self.stops.get().await
  }

  /// All services in API order, keyed by trimmed code, with favourite flags.
  pub async fn services(&self) -> Result<CacheResult<Vec<Favourited<Service>>>> {
    self.services.get().await
  }

  /// Live departures for a stop. Departures of favourite services are marked.
  pub async fn stop_departures(&self, sms: &str) -> Result<DepartureBoard> {
    let board = self.remote.fetch_departures(sms).await?;
    let favourites = self.favourite_services().await;
    Ok(board.into_board(&favourites))
  }

  /// Current disruptions followed by delays.
  pub async fn service_notices(&self) -> Result<Vec<ServiceNotice>> {
    let notices = self.remote.fetch_service_notices().await?;
    Ok(notices.into_notices())
  }

  pub async fn route_map(&self, mode: &str, code: &str, direction: &str) -> Result<RouteMap> {
    let map = self.remote.fetch_route_map(mode, code, direction).await?;
    Ok(map.into_route_map())
  }

  pub async fn vehicle_locations(&self, code: &str) -> Result<Vec<VehiclePosition>> {
    let locations = self.remote.fetch_vehicle_locations(code).await?;
    Ok(
      locations
        .services
        .into_iter()
        .map(|vehicle| vehicle.into_position())
        .collect(),
    )
  }

  /// Favourite service codes. An unreadable favourites table yields no marks.
  async fn favourite_services(&self) -> HashSet<String> {
    self.ready.wait().await;

    let store = Arc::clone(&self.store);
    let keys = tokio::task::spawn_blocking(move || store.favourite_keys::<Service>())
      .await
      .map_err(|e| Error::Store(format!("Store task failed: {}", e)))
      .and_then(|keys| keys);

    match keys {
      Ok(keys) => keys,
      Err(e) => {
        warn!(error = %e, "Failed to read favourite services");
        HashSet::new()
      }
    }
  }
}

fn stop_fetcher<R: RemoteCatalog>(remote: Arc<R>) -> Fetcher<Stops> {
  Arc::new(move || {
    let remote = remote.clone();
    async move { remote.fetch_stops().await }.boxed()
  })
}

fn service_fetcher<R: RemoteCatalog>(remote: Arc<R>) -> Fetcher<Services> {
  Arc::new(move || {
    let remote = remote.clone();
    async move { remote.fetch_services().await }.boxed()
  })
}
