use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Failure of the backing counter store.
///
/// Never reaches end users: the limiter logs it and fails open.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("counter store unavailable: {0}")]
	Unavailable(String),
}

/// Outcome of one atomic check-then-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
	/// Counter value before this hit. `0` means the window was just opened.
	pub previous: u64,
	/// Whether the counter was incremented.
	pub accepted: bool,
	/// Time left before the window closes.
	pub ttl: Duration,
}

/// Expiring counters keyed by string.
///
/// The primitive operations mirror a key-value cache (`get`, `set`,
/// `increment`, `expire`, `ttl`). Rate limiting must not be composed from
/// them: two callers could both read `count < max` and both increment.
/// Implementations provide `increment_within_limit` as a single atomic
/// operation instead.
pub trait CounterStore: Send + Sync {
	/// Current value, `None` if missing or expired.
	fn get(&self, key: &str) -> Result<Option<u64>, StoreError>;

	/// Overwrites the value and its expiry.
	fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError>;

	/// Adds one and returns the new value. A missing key starts at 1 with
	/// no expiry.
	fn increment(&self, key: &str) -> Result<u64, StoreError>;

	/// Sets the expiry of an existing key. Returns `false` if it is missing.
	fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

	/// Time left before the key expires, `None` if missing or without expiry.
	fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

	/// Atomically opens a window, or increments it while below `max`.
	///
	/// - missing key and `max > 0`: creates it at 1, expiring after `window`
	/// - existing key below `max`: increments it
	/// - otherwise: leaves it untouched and reports `accepted = false`
	fn increment_within_limit(&self, key: &str, max: u64, window: Duration) -> Result<WindowHit, StoreError>;
}

/// Source of the current instant, injectable for tests.
pub trait Clock: Send + Sync {
	fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
}

#[derive(Debug, Clone, Copy)]
struct Entry {
	count: u64,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}

	fn remaining(&self, now: Instant) -> Option<Duration> {
		self.expires_at.map(|at| at.saturating_duration_since(now))
	}
}

/// How often a store operation also sweeps every closed window.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Counters plus the instant of the next full sweep.
struct Table {
	entries: HashMap<String, Entry>,
	next_sweep: Instant,
}

impl Table {
	/// Drops every expired key. Returns how many were removed.
	fn sweep(&mut self, now: Instant) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, e| !e.is_expired(now));
		self.next_sweep = now.checked_add(SWEEP_INTERVAL).unwrap_or(now);
		before - self.entries.len()
	}
}

impl Deref for Table {
	type Target = HashMap<String, Entry>;

	fn deref(&self) -> &Self::Target {
		&self.entries
	}
}

impl DerefMut for Table {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.entries
	}
}

/// In-process counter store.
///
/// Every operation runs under one mutex, which is what makes
/// `increment_within_limit` atomic. The accessed key is dropped as soon as
/// its window closes, and at most every [`SWEEP_INTERVAL`] an operation also
/// evicts every other closed window, so keys that are never seen again do
/// not accumulate.
pub struct InMemoryCounterStore {
	table: Mutex<Table>,
	clock: Arc<dyn Clock>,
}

impl Default for InMemoryCounterStore {
	fn default() -> Self {
		Self::new()
	}
}

impl InMemoryCounterStore {
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		let next_sweep = clock.now().checked_add(SWEEP_INTERVAL).unwrap_or_else(|| clock.now());
		Self { table: Mutex::new(Table { entries: HashMap::new(), next_sweep }), clock }
	}

	fn lock(&self) -> Result<MutexGuard<'_, Table>, StoreError> {
		self.table
			.lock()
			.map_err(|_| StoreError::Unavailable("counter lock poisoned".to_owned()))
	}

	/// Locks the table, sweeps it when due, and drops `key` if its window
	/// has closed.
	fn live(&self, key: &str) -> Result<(MutexGuard<'_, Table>, Instant), StoreError> {
		let now = self.clock.now();
		let mut table = self.lock()?;
		if now >= table.next_sweep {
			table.sweep(now);
		} else if table.get(key).is_some_and(|e| e.is_expired(now)) {
			table.remove(key);
		}
		Ok((table, now))
	}

	/// Drops every expired key now. Returns how many were removed.
	pub fn purge_expired(&self) -> Result<usize, StoreError> {
		let now = self.clock.now();
		Ok(self.lock()?.sweep(now))
	}

	/// Number of keys currently held, expired or not.
	pub fn len(&self) -> Result<usize, StoreError> {
		Ok(self.lock()?.len())
	}

	pub fn is_empty(&self) -> Result<bool, StoreError> {
		Ok(self.len()? == 0)
	}
}

impl CounterStore for InMemoryCounterStore {
	fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
		let (entries, _) = self.live(key)?;
		Ok(entries.get(key).map(|e| e.count))
	}

	fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError> {
		let now = self.clock.now();
		let mut entries = self.lock()?;
		entries.insert(key.to_owned(), Entry { count: value, expires_at: now.checked_add(ttl) });
		Ok(())
	}

	fn increment(&self, key: &str) -> Result<u64, StoreError> {
		let (mut entries, _) = self.live(key)?;
		let entry = entries.entry(key.to_owned()).or_insert(Entry { count: 0, expires_at: None });
		entry.count += 1;
		Ok(entry.count)
	}

	fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
		let (mut entries, now) = self.live(key)?;
		match entries.get_mut(key) {
			Some(entry) => {
				entry.expires_at = now.checked_add(ttl);
				Ok(true)
			}
			None => Ok(false),
		}
	}

	fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
		let (entries, now) = self.live(key)?;
		Ok(entries.get(key).and_then(|e| e.remaining(now)))
	}

	fn increment_within_limit(&self, key: &str, max: u64, window: Duration) -> Result<WindowHit, StoreError> {
		let (mut entries, now) = self.live(key)?;

		if let Some(entry) = entries.get_mut(key) {
			// A counter left without expiry would never reset.
			if entry.expires_at.is_none() {
				entry.expires_at = now.checked_add(window);
			}
			let previous = entry.count;
			let ttl = entry.remaining(now).unwrap_or(window);
			let accepted = previous < max;
			if accepted {
				entry.count += 1;
			}
			return Ok(WindowHit { previous, accepted, ttl });
		}

		if max == 0 {
			return Ok(WindowHit { previous: 0, accepted: false, ttl: Duration::ZERO });
		}
		entries.insert(key.to_owned(), Entry { count: 1, expires_at: now.checked_add(window) });
		Ok(WindowHit { previous: 0, accepted: true, ttl: window })
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	/// Clock that only moves when told to.
	pub(crate) struct ManualClock(Mutex<Instant>);

	impl ManualClock {
		pub(crate) fn new() -> Arc<Self> {
			Arc::new(Self(Mutex::new(Instant::now())))
		}

		pub(crate) fn advance(&self, by: Duration) {
			let mut now = self.0.lock().unwrap();
			*now += by;
		}
	}

	impl Clock for ManualClock {
		fn now(&self) -> Instant {
			*self.0.lock().unwrap()
		}
	}

	#[test]
	fn primitives_follow_cache_semantics() {
		let clock = ManualClock::new();
		let store = InMemoryCounterStore::with_clock(clock.clone());

		assert_eq!(store.get("k").unwrap(), None);
		assert_eq!(store.increment("k").unwrap(), 1);
		assert_eq!(store.increment("k").unwrap(), 2);
		assert_eq!(store.ttl("k").unwrap(), None);

		assert!(store.expire("k", Duration::from_secs(10)).unwrap());
		assert!(!store.expire("missing", Duration::from_secs(10)).unwrap());
		assert_eq!(store.ttl("k").unwrap(), Some(Duration::from_secs(10)));

		clock.advance(Duration::from_secs(4));
		assert_eq!(store.ttl("k").unwrap(), Some(Duration::from_secs(6)));

		clock.advance(Duration::from_secs(6));
		assert_eq!(store.get("k").unwrap(), None);

		store.set("k", 7, Duration::from_secs(1)).unwrap();
		assert_eq!(store.get("k").unwrap(), Some(7));
	}

	#[test]
	fn window_opens_counts_and_closes() {
		let clock = ManualClock::new();
		let store = InMemoryCounterStore::with_clock(clock.clone());
		let window = Duration::from_secs(60);

		let first = store.increment_within_limit("k", 2, window).unwrap();
		assert_eq!(first, WindowHit { previous: 0, accepted: true, ttl: window });

		clock.advance(Duration::from_secs(10));
		let second = store.increment_within_limit("k", 2, window).unwrap();
		assert_eq!(second, WindowHit { previous: 1, accepted: true, ttl: Duration::from_secs(50) });

		let third = store.increment_within_limit("k", 2, window).unwrap();
		assert!(!third.accepted);
		assert_eq!(store.get("k").unwrap(), Some(2));

		clock.advance(Duration::from_secs(50));
		let reopened = store.increment_within_limit("k", 2, window).unwrap();
		assert_eq!(reopened.previous, 0);
		assert!(reopened.accepted);
	}

	#[test]
	fn zero_max_never_creates_a_record() {
		let store = InMemoryCounterStore::new();
		let hit = store.increment_within_limit("k", 0, Duration::from_secs(5)).unwrap();
		assert!(!hit.accepted);
		assert!(store.is_empty().unwrap());
	}

	#[test]
	fn counters_without_expiry_get_one() {
		let store = InMemoryCounterStore::new();
		store.increment("k").unwrap();
		store.increment_within_limit("k", 5, Duration::from_secs(30)).unwrap();
		assert!(store.ttl("k").unwrap().is_some());
	}

	#[test]
	fn purge_drops_closed_windows() {
		let clock = ManualClock::new();
		let store = InMemoryCounterStore::with_clock(clock.clone());
		store.set("a", 1, Duration::from_secs(1)).unwrap();
		store.set("b", 1, Duration::from_secs(100)).unwrap();
		clock.advance(Duration::from_secs(2));
		assert_eq!(store.purge_expired().unwrap(), 1);
		assert_eq!(store.len().unwrap(), 1);
	}

	#[test]
	fn closed_windows_of_other_keys_are_evicted() {
		let clock = ManualClock::new();
		let store = InMemoryCounterStore::with_clock(clock.clone());
		let window = Duration::from_secs(600);

		for i in 0..10_000 {
			store.increment_within_limit(&format!("rate_limit:http:{i}"), 50, window).unwrap();
		}
		assert_eq!(store.len().unwrap(), 10_000);

		clock.advance(Duration::from_secs(3600));
		store.increment_within_limit("rate_limit:http:fresh", 50, window).unwrap();
		assert_eq!(store.len().unwrap(), 1);
	}

	#[test]
	fn sweeps_wait_for_the_interval() {
		let clock = ManualClock::new();
		let store = InMemoryCounterStore::with_clock(clock.clone());
		store.set("short", 1, Duration::from_secs(1)).unwrap();

		clock.advance(Duration::from_secs(2));
		store.increment_within_limit("other", 5, Duration::from_secs(600)).unwrap();
		assert_eq!(store.len().unwrap(), 2);

		clock.advance(SWEEP_INTERVAL);
		store.increment_within_limit("other", 5, Duration::from_secs(600)).unwrap();
		assert_eq!(store.len().unwrap(), 1);
		assert_eq!(store.get("other").unwrap(), Some(2));
	}
}
