//! In-memory TTL cache for feed responses.
//!
//! Keyed by a BLAKE3 digest of the request, so identical requests share an
//! entry. The cache is owned by the caller and shared through `Arc`; it is
//! never a process-wide global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use twlab_core::data::{DataError, DataFeed, FeedRequest, InstrumentDirectory, RawRecord};
use twlab_core::domain::InstrumentInfo;

/// Cache key for a request (hex BLAKE3 of dataset, instrument, start, end).
pub type CacheKey = String;

struct Entry {
    stored_at: Instant,
    records: Arc<Vec<RawRecord>>,
}

pub struct FetchCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(request: &FeedRequest) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(request.dataset.name().as_bytes());
        hasher.update(&[0]);
        hasher.update(request.instrument_id.as_deref().unwrap_or("*").as_bytes());
        hasher.update(&[0]);
        hasher.update(request.start.to_string().as_bytes());
        hasher.update(&[0]);
        if let Some(end) = request.end {
            hasher.update(end.to_string().as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    // Entries are replaced whole, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        entry.stored_at.elapsed() < self.ttl
    }

    /// Fresh entry for `request`, if any. A stale entry is evicted on the spot.
    pub fn get(&self, request: &FeedRequest) -> Option<Arc<Vec<RawRecord>>> {
        let key = Self::key(request);
        let mut entries = self.lock();
        let entry = entries.get(&key)?;
        if self.is_fresh(entry) {
            return Some(Arc::clone(&entry.records));
        }
        entries.remove(&key);
        None
    }

    /// Store `records` for `request`, sweeping out any stale entries first.
    pub fn insert(&self, request: &FeedRequest, records: Vec<RawRecord>) {
        let key = Self::key(request);
        let mut entries = self.lock();
        entries.retain(|_, e| self.is_fresh(e));
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                records: Arc::new(records),
            },
        );
    }

    /// Drop stale entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| self.is_fresh(e));
        before - entries.len()
    }

    /// Number of stored entries. Stale ones linger only until the next
    /// `get` of that key, `insert` or `purge_expired`.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A `DataFeed` that consults a shared `FetchCache` before the inner feed.
///
/// Only non-empty successful responses are stored, so a failed or empty day
/// is retried on the next call.
pub struct CachedFeed<F> {
    inner: F,
    cache: Arc<FetchCache>,
}

impl<F: DataFeed> CachedFeed<F> {
    pub fn new(inner: F, cache: Arc<FetchCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }
}

impl<F: DataFeed> DataFeed for CachedFeed<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
        if let Some(records) = self.cache.get(request) {
            debug!(
                dataset = request.dataset.name(),
                instrument = request.instrument_id.as_deref().unwrap_or("*"),
                start = %request.start,
                records = records.len(),
                "cache hit"
            );
            return Ok(Vec::clone(&records));
        }

        let records = self.inner.fetch(request)?;
        if !records.is_empty() {
            self.cache.insert(request, records.clone());
        }
        Ok(records)
    }
}

impl<F: InstrumentDirectory> InstrumentDirectory for CachedFeed<F> {
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError> {
        self.inner.list_instruments()
    }
}
