//! Time-to-live refresh policy shared by the cached collections.
//!
//! A collection is served from the local store while its last refresh is
//! younger than the TTL and the store holds rows. Otherwise it is repopulated
//! as a whole, strictly in this order:
//!
//! 1. clear the collection
//! 2. fetch the full list from the remote API
//! 3. transform and insert rows (best effort, failed rows are logged and dropped)
//! 4. record the refresh instant
//! 5. re-read the collection joined with its favourites
//!
//! Overlapping calls for the same collection join the in-flight load instead of
//! starting a second repopulation.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::ready::ReadyGate;
use super::storage::CollectionStore;
use super::timestamps::TimestampStore;
use super::traits::{CacheResult, Collection, Favourited};
use crate::error::{Error, Result};

/// Default time-to-live for a cached collection, in hours
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Function fetching the raw records of a collection from the remote API.
pub type Fetcher<C> =
  Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<<C as Collection>::Raw>>> + Send + Sync>;

type Rows<C> = Arc<Vec<Favourited<<C as Collection>::Row>>>;
type SharedLoad<C> = Shared<BoxFuture<'static, Result<CacheResult<Rows<C>>>>>;

/// Whether a collection last refreshed at `last` must be repopulated at `now`.
pub fn is_stale(last: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
  match last {
    Some(at) => now - at >= ttl,
    None => true,
  }
}

/// Cache refresh policy for one collection.
pub struct RefreshPolicy<C: Collection, S, P> {
  inner: Arc<Inner<C, S, P>>,
}

struct Inner<C: Collection, S, P> {
  store: Arc<S>,
  timestamps: Arc<P>,
  ready: ReadyGate,
  ttl: Duration,
  fetcher: Fetcher<C>,
  in_flight: Mutex<Option<SharedLoad<C>>>,
  _collection: PhantomData<fn() -> C>,
}

impl<C, S, P> RefreshPolicy<C, S, P>
where
  C: Collection,
  S: CollectionStore + 'static,
  P: TimestampStore + 'static,
{
  pub fn new(store: Arc<S>, timestamps: Arc<P>, ready: ReadyGate, fetcher: Fetcher<C>) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        timestamps,
        ready,
        ttl: Duration::hours(DEFAULT_TTL_HOURS),
        fetcher,
        in_flight: Mutex::new(None),
        _collection: PhantomData,
      }),
    }
  }

  /// Set the time-to-live. Only valid before the policy is shared.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    match Arc::get_mut(&mut self.inner) {
      Some(inner) => inner.ttl = ttl,
      None => warn!(collection = C::name(), "TTL change ignored on a shared policy"),
    }
    self
  }

  pub fn ttl(&self) -> Duration {
    self.inner.ttl
  }

  /// Get the collection, repopulating it first when stale or empty.
  ///
  /// A remote failure rejects the call and leaves the collection cleared; the
  /// next call evaluates staleness again and retries.
  pub async fn get(&self) -> Result<CacheResult<Vec<Favourited<C::Row>>>> {
    let load = {
      let mut slot = self
        .inner
        .in_flight
        .lock()
        .map_err(|e| Error::Store(format!("Lock poisoned: {}", e)))?;

      match slot.as_ref() {
        Some(load) => {
          debug!(collection = C::name(), "Joining in-flight load");
          load.clone()
        }
        None => {
          let inner = Arc::clone(&self.inner);
          let load = async move {
            let result = inner.load().await;
            if let Ok(mut slot) = inner.in_flight.lock() {
              *slot = None;
            }
            result
          }
          .boxed()
          .shared();
          *slot = Some(load.clone());
          load
        }
      }
    };

    let result = load.await?;
    Ok(result.map(|rows| Arc::try_unwrap(rows).unwrap_or_else(|rows| rows.as_ref().clone())))
  }
}

impl<C, S, P> Clone for RefreshPolicy<C, S, P>
where
  C: Collection,
{
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<C, S, P> Inner<C, S, P>
where
  C: Collection,
  S: CollectionStore + 'static,
  P: TimestampStore + 'static,
{
  async fn load(&self) -> Result<CacheResult<Rows<C>>> {
    self.ready.wait().await;

    let last = self.last_refreshed().await;
    let now = Utc::now();

    match last {
      Some(at) if !is_stale(last, now, self.ttl) => {
        let rows = self.read().await?;
        if !rows.is_empty() {
          debug!(collection = C::name(), rows = rows.len(), "Serving fresh collection from store");
          return Ok(CacheResult::from_store(Arc::new(rows), at));
        }
        info!(collection = C::name(), "Store empty despite fresh timestamp, repopulating");
      }
      Some(at) => info!(collection = C::name(), last_refreshed = %at, "Collection stale, repopulating"),
      None => info!(collection = C::name(), "No refresh recorded, repopulating"),
    }

    self.repopulate().await
  }

  async fn repopulate(&self) -> Result<CacheResult<Rows<C>>> {
    blocking(&self.store, |store| store.clear::<C::Row>()).await?;

    let raw = (self.fetcher)().await.map_err(|e| {
      warn!(collection = C::name(), error = %e, "API call failed");
      e
    })?;
    let fetched = raw.len();

    let rows = C::transform(raw);
    let kept = rows.len();
    let report = blocking(&self.store, move |store| store.insert_all(&rows)).await?;
    info!(
      collection = C::name(),
      fetched,
      kept,
      inserted = report.inserted,
      failed = report.failed(),
      "Repopulated collection from API"
    );

    let now = Utc::now();
    if let Err(e) = blocking(&self.timestamps, move |timestamps| {
      timestamps.set(C::LAST_UPDATED_KEY, now)
    })
    .await
    {
      warn!(collection = C::name(), error = %e, "Failed to record refresh time");
    }

    let rows = self.read().await?;
    if rows.is_empty() {
      warn!(collection = C::name(), "Inserted but still no rows");
    }

    Ok(CacheResult::from_network(Arc::new(rows), now))
  }

  /// Last refresh instant. An unreadable preference counts as absent.
  async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
    match blocking(&self.timestamps, |timestamps| timestamps.get(C::LAST_UPDATED_KEY)).await {
      Ok(last) => last,
      Err(e) => {
        warn!(collection = C::name(), error = %e, "No last-updated time found");
        None
      }
    }
  }

  async fn read(&self) -> Result<Vec<Favourited<C::Row>>> {
    blocking(&self.store, |store| store.read_with_favourites::<C::Row>()).await
  }
}

/// Run a synchronous store call on the blocking pool.
async fn blocking<X, T, F>(target: &Arc<X>, f: F) -> Result<T>
where
  X: Send + Sync + 'static,
  T: Send + 'static,
  F: FnOnce(&X) -> Result<T> + Send + 'static,
{
  let target = Arc::clone(target);
  tokio::task::spawn_blocking(move || f(&target))
    .await
    .map_err(|e| Error::Store(format!("Store task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::{CountingPreferences, CountingStore, FailingPreferences};
  use crate::cache::{CacheSource, SqlitePreferences, SqliteStore};
  use crate::db::Database;
  use crate::metlink::api_types::ApiStop;
  use crate::metlink::cache::Stops;
  use crate::metlink::types::Stop;
  use std::sync::atomic::{AtomicUsize, Ordering};

  type TestPolicy =
    RefreshPolicy<Stops, CountingStore<SqliteStore>, CountingPreferences<SqlitePreferences>>;

  struct Harness {
    store: Arc<CountingStore<SqliteStore>>,
    prefs: Arc<CountingPreferences<SqlitePreferences>>,
    fetches: Arc<AtomicUsize>,
  }

  fn api_stop(sms: &str, name: &str) -> ApiStop {
    ApiStop {
      name: name.to_string(),
      sms: sms.to_string(),
      farezone: "1".to_string(),
      lat: "-41.27".to_string(),
      long: "174.78".to_string(),
      last_modified: "2019-04-16T00:00:31+12:00".to_string(),
    }
  }

  fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    Harness {
      store: Arc::new(CountingStore::new(SqliteStore::new(db.clone()))),
      prefs: Arc::new(CountingPreferences::new(SqlitePreferences::new(db))),
      fetches: Arc::new(AtomicUsize::new(0)),
    }
  }

  fn fetcher(fetches: Arc<AtomicUsize>, stops: Vec<ApiStop>) -> Fetcher<Stops> {
    Arc::new(move || {
      let fetches = fetches.clone();
      let stops = stops.clone();
      async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        Ok(stops)
      }
      .boxed()
    })
  }

  fn failing_fetcher(fetches: Arc<AtomicUsize>) -> Fetcher<Stops> {
    Arc::new(move || {
      let fetches = fetches.clone();
      async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        Err(Error::RemoteFetch {
          resource: "StopList".to_string(),
          status: Some(503),
          message: "Status 503 Service Unavailable".to_string(),
        })
      }
      .boxed()
    })
  }

  impl Harness {
    fn policy(&self, fetcher: Fetcher<Stops>) -> TestPolicy {
      RefreshPolicy::new(
        self.store.clone(),
        self.prefs.clone(),
        ReadyGate::opened(),
        fetcher,
      )
    }

    fn default_policy(&self) -> TestPolicy {
      self.policy(fetcher(
        self.fetches.clone(),
        vec![api_stop("5000", "Wellington"), api_stop("4130", "Karori")],
      ))
    }
  }

  #[test]
  fn test_staleness() {
    let now = Utc::now();
    let ttl = Duration::hours(DEFAULT_TTL_HOURS);
    assert!(is_stale(None, now, ttl));
    assert!(is_stale(Some(now - Duration::days(1)), now, ttl));
    assert!(is_stale(Some(now - Duration::days(3)), now, ttl));
    assert!(!is_stale(Some(now - Duration::hours(23)), now, ttl));
    assert!(!is_stale(Some(now + Duration::hours(2)), now, ttl));
  }

  #[tokio::test]
  async fn test_first_run_repopulates_once() {
    let h = harness();
    let policy = h.default_policy();

    let result = policy.get().await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data.len(), 2);
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.clears(), 1);
    assert_eq!(h.store.inserts(), 1);
    assert_eq!(h.prefs.sets(), 1);
    assert_eq!(h.prefs.gets(), 1);
    assert!(h.prefs.get(Stops::LAST_UPDATED_KEY).unwrap().is_some());
  }

  #[tokio::test]
  async fn test_fresh_collection_skips_network() {
    let h = harness();
    let policy = h.default_policy();

    let first = policy.get().await.unwrap();
    let second = policy.get().await.unwrap();
    let third = policy.get().await.unwrap();

    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(second.source, CacheSource::Store);
    assert_eq!(
      serde_json::to_string(&second.data).unwrap(),
      serde_json::to_string(&third.data).unwrap()
    );
    assert_eq!(first.data, second.data);
  }

  #[tokio::test]
  async fn test_day_old_collection_is_repopulated() {
    let h = harness();
    let policy = h.default_policy();
    policy.get().await.unwrap();

    h.prefs
      .set(Stops::LAST_UPDATED_KEY, Utc::now() - Duration::days(1))
      .unwrap();
    let result = policy.get().await.unwrap();

    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(h.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.clears(), 2);
    assert_eq!(h.store.inserts(), 2);
  }

  #[tokio::test]
  async fn test_empty_store_with_fresh_timestamp_is_repopulated() {
    let h = harness();
    h.prefs.set(Stops::LAST_UPDATED_KEY, Utc::now()).unwrap();
    let policy = h.default_policy();

    let result = policy.get().await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data.len(), 2);
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_failure_rejects_and_leaves_store_cleared() {
    let h = harness();
    h.default_policy().get().await.unwrap();
    h.prefs
      .set(Stops::LAST_UPDATED_KEY, Utc::now() - Duration::days(2))
      .unwrap();

    let failing = h.policy(failing_fetcher(h.fetches.clone()));
    let err = failing.get().await.unwrap_err();
    assert!(err.is_remote());
    assert!(h.store.inner().read_with_favourites::<Stop>().unwrap().is_empty());

    // Next access retries
    let recovered = h.default_policy().get().await.unwrap();
    assert_eq!(recovered.source, CacheSource::Network);
    assert_eq!(recovered.data.len(), 2);
  }

  #[tokio::test]
  async fn test_unreadable_timestamp_forces_repopulation() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let store = Arc::new(SqliteStore::new(db));
    let fetches = Arc::new(AtomicUsize::new(0));
    let policy: RefreshPolicy<Stops, _, _> = RefreshPolicy::new(
      store,
      Arc::new(FailingPreferences),
      ReadyGate::opened(),
      fetcher(fetches.clone(), vec![api_stop("5000", "Wellington")]),
    );

    policy.get().await.unwrap();
    let result = policy.get().await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_favourites_survive_repopulation() {
    let h = harness();
    h.store.inner().mark_favourite::<Stop>("4130").unwrap();
    let policy = h.default_policy();

    let repopulated = policy.get().await.unwrap();
    let fresh = policy.get().await.unwrap();

    for result in [repopulated, fresh] {
      let karori = result.data.iter().find(|s| s.item.sms == "4130").unwrap();
      let wellington = result.data.iter().find(|s| s.item.sms == "5000").unwrap();
      assert!(karori.is_favourite);
      assert!(!wellington.is_favourite);
    }
  }

  #[tokio::test]
  async fn test_one_failed_insert_keeps_the_rest() {
    let h = harness();
    let mut stops: Vec<ApiStop> = (1..=99)
      .map(|i| api_stop(&i.to_string(), "Stop"))
      .collect();
    stops.push(api_stop("42", "Duplicate"));
    let policy = h.policy(fetcher(h.fetches.clone(), stops));

    let result = policy.get().await.unwrap();
    assert_eq!(result.data.len(), 99);
    let sms: Vec<u32> = result.data.iter().map(|s| s.item.sms.parse().unwrap()).collect();
    assert!(sms.windows(2).all(|w| w[0] < w[1]));
  }

  #[tokio::test]
  async fn test_overlapping_calls_share_one_refresh() {
    let h = harness();
    let fetches = h.fetches.clone();
    let slow: Fetcher<Stops> = Arc::new(move || {
      let fetches = fetches.clone();
      async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(vec![api_stop("5000", "Wellington")])
      }
      .boxed()
    });
    let policy = h.policy(slow);

    let (a, b, c) = tokio::join!(policy.get(), policy.get(), policy.get());
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.clears(), 1);
    for result in [a, b, c] {
      assert_eq!(result.unwrap().data.len(), 1);
    }

    // The in-flight slot is released once the load settles
    policy.get().await.unwrap();
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_overlapping_calls_share_failure() {
    let h = harness();
    let policy = h.policy(failing_fetcher(h.fetches.clone()));

    let (a, b) = tokio::join!(policy.get(), policy.get());
    assert!(a.unwrap_err().is_remote());
    assert!(b.unwrap_err().is_remote());
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_waits_for_ready_gate() {
    let h = harness();
    let gate = ReadyGate::closed();
    let policy: RefreshPolicy<Stops, _, _> = RefreshPolicy::new(
      h.store.clone(),
      h.prefs.clone(),
      gate.clone(),
      fetcher(h.fetches.clone(), vec![api_stop("5000", "Wellington")]),
    );

    let pending = tokio::spawn(async move { policy.get().await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(h.store.clears(), 0);
    assert_eq!(h.fetches.load(Ordering::SeqCst), 0);

    gate.open();
    let result = pending.await.unwrap().unwrap();
    assert_eq!(result.data.len(), 1);
  }

  #[tokio::test]
  async fn test_custom_ttl() {
    let h = harness();
    let policy = h.default_policy().with_ttl(Duration::zero());
    assert_eq!(policy.ttl(), Duration::zero());

    policy.get().await.unwrap();
    policy.get().await.unwrap();
    assert_eq!(h.fetches.load(Ordering::SeqCst), 2);
  }
}
