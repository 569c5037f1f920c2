//! Budget-aware request scheduler with response memoization.
//!
//! All remote I/O funnels through here: a token reservoir bounds total
//! requests per interval, a semaphore bounds concurrency, a minimum gap
//! spaces out dispatches, and per-key caches guarantee that one key is
//! fetched at most once per reconciliation run — concurrent callers for
//! the same key await the same in-flight fetch.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::{Mutex, OnceCell, Semaphore};
use tokio::time::{sleep, Instant};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Token reservoir size (burst capacity).
    pub reservoir: u32,
    /// Interval over which `refill_amount` tokens are restored.
    pub refill_interval: Duration,
    /// Tokens restored per interval.
    pub refill_amount: u32,
    /// Minimum spacing between dispatched requests.
    pub min_gap: Duration,
    /// Maximum simultaneous in-flight requests.
    pub max_concurrency: usize,
    /// Dispatched-request count past which a cooldown is inserted.
    pub heavy_use_threshold: u32,
    /// Cooldown pause inserted on sustained heavy usage.
    pub cooldown: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reservoir: 90,
            refill_interval: Duration::from_secs(60),
            refill_amount: 90,
            min_gap: Duration::from_millis(250),
            max_concurrency: 3,
            heavy_use_threshold: 9,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Paces remote requests under a fixed budget.
///
/// Requests beyond the budget queue in FIFO order on the semaphore and
/// limiter and dispatch as slots and tokens free up. Rate exhaustion is
/// absorbed here by waiting; it is never surfaced as an error.
pub struct FetchScheduler {
    limiter: DirectLimiter,
    slots: Semaphore,
    min_gap: Duration,
    last_dispatch: Mutex<Option<Instant>>,
    dispatched: AtomicU32,
    heavy_use_threshold: u32,
    cooldown: Duration,
}

impl FetchScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        let period = config.refill_interval / config.refill_amount.max(1);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(config.reservoir).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: RateLimiter::direct(quota),
            slots: Semaphore::new(config.max_concurrency.max(1)),
            min_gap: config.min_gap,
            last_dispatch: Mutex::new(None),
            dispatched: AtomicU32::new(0),
            heavy_use_threshold: config.heavy_use_threshold,
            cooldown: config.cooldown,
        }
    }

    /// Requests dispatched so far in this run.
    pub fn dispatched(&self) -> u32 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Run one remote request under the budget.
    ///
    /// Suspends until a concurrency slot, a reservoir token, and the
    /// minimum spacing are all satisfied, then drives the future while
    /// holding the slot.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let _permit = self
            .slots
            .acquire()
            .await
            .expect("scheduler semaphore is never closed");
        self.pace().await;
        fut.await
    }

    async fn pace(&self) {
        let n = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        if self.heavy_use_threshold > 0
            && n > self.heavy_use_threshold
            && (n - 1) % self.heavy_use_threshold == 0
        {
            tracing::info!(
                dispatched = n,
                cooldown_secs = self.cooldown.as_secs(),
                "request budget heavily used, cooling down"
            );
            sleep(self.cooldown).await;
        }

        self.limiter.until_ready().await;

        loop {
            let now = Instant::now();
            let mut last = self.last_dispatch.lock().await;
            match *last {
                Some(prev) if now < prev + self.min_gap => {
                    let wait = (prev + self.min_gap) - now;
                    drop(last);
                    sleep(wait).await;
                }
                _ => {
                    *last = Some(now);
                    break;
                }
            }
        }
    }
}

/// Write-once-per-key memoization cache with in-flight de-duplication.
///
/// Each key holds a `OnceCell`; concurrent fetches for the same key
/// race only to start the one initialization and all observe its
/// result. A failed fetch leaves the cell empty so a later scan can
/// retry. Keys with an active fetch are tracked separately so batch
/// callers can tell an unsettled key apart from one already being
/// fetched, instead of re-requesting it.
pub struct RequestCache<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
    in_flight: StdMutex<HashMap<K, usize>>,
}

/// Decrements the in-flight count for its key on drop, including when
/// the owning fetch future is cancelled.
struct InFlightGuard<'a, K: Eq + Hash> {
    map: &'a StdMutex<HashMap<K, usize>>,
    key: K,
}

impl<K: Eq + Hash> Drop for InFlightGuard<'_, K> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = map.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                map.remove(&self.key);
            }
        }
    }
}

impl<K, V> Default for RequestCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RequestCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for a key, or run `fetch` to produce it.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key.clone()).or_default().clone()
        };
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }

        let _flight = self.mark_in_flight(key);
        let value = cell.get_or_try_init(fetch).await?;
        Ok(value.clone())
    }

    fn mark_in_flight(&self, key: K) -> InFlightGuard<'_, K> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *map.entry(key.clone()).or_insert(0) += 1;
        InFlightGuard {
            map: &self.in_flight,
            key,
        }
    }

    /// Partition keys into those free for the caller to fetch and those
    /// another caller is already fetching. Settled and duplicate keys
    /// are dropped. Both maps are inspected under their locks in one
    /// pass so a key cannot move between buckets mid-partition.
    pub async fn partition_pending(&self, keys: &[K]) -> (Vec<K>, Vec<K>) {
        let cells = self.cells.lock().await;
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        let mut free = Vec::new();
        let mut busy = Vec::new();
        for key in keys {
            if free.contains(key) || busy.contains(key) {
                continue;
            }
            if cells.get(key).is_some_and(|cell| cell.get().is_some()) {
                continue;
            }
            if in_flight.get(key).copied().unwrap_or(0) > 0 {
                busy.push(key.clone());
            } else {
                free.push(key.clone());
            }
        }
        (free, busy)
    }

    /// Seed a value without fetching. A no-op if the key is already set.
    pub async fn insert(&self, key: K, value: V) {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key).or_default().clone()
        };
        let _ = cell.get_or_init(|| async move { value }).await;
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// All settled values currently in the cache.
    pub async fn values(&self) -> Vec<V> {
        let cells = self.cells.lock().await;
        cells.values().filter_map(|cell| cell.get().cloned()).collect()
    }

    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cells.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.cells.lock().await.clear();
    }
}
