//! Test doubles for the storage traits.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::storage::{CollectionStore, InsertReport};
use super::timestamps::TimestampStore;
use super::traits::{CachedRow, Favourited};
use crate::error::{Error, Result};

/// Store wrapper counting repopulation steps.
pub struct CountingStore<S> {
  inner: S,
  clears: AtomicUsize,
  inserts: AtomicUsize,
  reads: AtomicUsize,
}

impl<S> CountingStore<S> {
  pub fn new(inner: S) -> Self {
    Self {
      inner,
      clears: AtomicUsize::new(0),
      inserts: AtomicUsize::new(0),
      reads: AtomicUsize::new(0),
    }
  }

  pub fn inner(&self) -> &S {
    &self.inner
  }

  pub fn clears(&self) -> usize {
    self.clears.load(Ordering::SeqCst)
  }

  pub fn inserts(&self) -> usize {
    self.inserts.load(Ordering::SeqCst)
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

impl<S: CollectionStore> CollectionStore for CountingStore<S> {
  fn clear<T: CachedRow>(&self) -> Result<()> {
    self.clears.fetch_add(1, Ordering::SeqCst);
    self.inner.clear::<T>()
  }

  fn insert_all<T: CachedRow>(&self, rows: &[T]) -> Result<InsertReport> {
    self.inserts.fetch_add(1, Ordering::SeqCst);
    self.inner.insert_all(rows)
  }

  fn read_with_favourites<T: CachedRow>(&self) -> Result<Vec<Favourited<T>>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self.inner.read_with_favourites()
  }

  fn favourite_keys<T: CachedRow>(&self) -> Result<HashSet<String>> {
    self.inner.favourite_keys::<T>()
  }
}

/// Timestamp store wrapper counting reads and writes.
pub struct CountingPreferences<P> {
  inner: P,
  gets: AtomicUsize,
  sets: AtomicUsize,
}

impl<P> CountingPreferences<P> {
  pub fn new(inner: P) -> Self {
    Self {
      inner,
      gets: AtomicUsize::new(0),
      sets: AtomicUsize::new(0),
    }
  }

  pub fn gets(&self) -> usize {
    self.gets.load(Ordering::SeqCst)
  }

  pub fn sets(&self) -> usize {
    self.sets.load(Ordering::SeqCst)
  }
}

impl<P: TimestampStore> TimestampStore for CountingPreferences<P> {
  fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    self.gets.fetch_add(1, Ordering::SeqCst);
    self.inner.get(key)
  }

  fn set(&self, key: &str, at: DateTime<Utc>) -> Result<()> {
    self.sets.fetch_add(1, Ordering::SeqCst);
    self.inner.set(key, at)
  }
}

/// Preference store that cannot be read or written.
pub struct FailingPreferences;

impl TimestampStore for FailingPreferences {
  fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    Err(Error::PreferenceRead {
      key: key.to_string(),
      message: "preferences unavailable".to_string(),
    })
  }

  fn set(&self, _key: &str, _at: DateTime<Utc>) -> Result<()> {
    Err(Error::Store("preferences unavailable".to_string()))
  }
}
