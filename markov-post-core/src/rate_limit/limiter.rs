use std::sync::Arc;
use std::time::Duration;

use log::warn;
use serde::Serialize;

use crate::config::RateLimitConfig;
use super::store::{CounterStore, InMemoryCounterStore};

/// Verdict of one rate-limit check.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
	pub allowed: bool,
	/// Hits still available in the current window.
	pub left: u64,
	/// Seconds until the window resets.
	pub reset_seconds: u64,
}

impl RateLimitResult {
	/// Verdict returned when the store cannot be reached.
	pub const FAIL_OPEN: Self = Self { allowed: true, left: 1, reset_seconds: 0 };
}

/// Fixed-window rate limiter over an injected counter store.
///
/// Each `(namespace, identity)` pair owns a counter that opens on the first
/// hit and resets entirely when its window expires. The check and the
/// increment happen in one atomic store call, so concurrent callers can
/// never push a counter past `max`.
///
/// If the store fails, the limiter logs a warning and allows the request.
/// Losing the counter must never block generation.
#[derive(Clone)]
pub struct RateLimiter {
	store: Arc<dyn CounterStore>,
	config: RateLimitConfig,
}

impl RateLimiter {
	pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
		Self { store, config }
	}

	/// Limiter backed by an [`InMemoryCounterStore`].
	pub fn in_memory(config: RateLimitConfig) -> Self {
		Self::new(Arc::new(InMemoryCounterStore::new()), config)
	}

	pub fn config(&self) -> &RateLimitConfig {
		&self.config
	}

	fn key(namespace: &str, identity: &str) -> String {
		format!("rate_limit:{namespace}:{identity}")
	}

	/// Records one hit against an explicit quota.
	///
	/// - new window: `allowed`, `left = max - 1`, `reset = window`
	/// - open window below `max`: `allowed`, `left = max - 1 - previous`
	/// - open window at `max`: denied, `left = 0`, nothing recorded
	pub fn hit(&self, namespace: &str, identity: &str, max: u64, window: Duration) -> RateLimitResult {
		let key = Self::key(namespace, identity);
		let hit = match self.store.increment_within_limit(&key, max, window) {
			Ok(hit) => hit,
			Err(e) => {
				warn!("rate limit store unavailable, allowing {key}: {e}");
				return RateLimitResult::FAIL_OPEN;
			}
		};

		let reset_seconds = ceil_seconds(hit.ttl);
		if hit.accepted {
			RateLimitResult {
				allowed: true,
				left: max.saturating_sub(1).saturating_sub(hit.previous),
				reset_seconds,
			}
		} else {
			RateLimitResult { allowed: false, left: 0, reset_seconds }
		}
	}

	/// Records one hit against the configured quota.
	///
	/// Exempt identities are allowed without touching the store.
	pub fn check(&self, namespace: &str, identity: &str) -> RateLimitResult {
		if self.config.is_exempt(identity) {
			return RateLimitResult { allowed: true, left: self.config.max, reset_seconds: 0 };
		}
		self.hit(namespace, identity, self.config.max, self.config.window())
	}

	/// Read-only variant of [`check`](Self::check): reports whether a hit
	/// would be allowed right now, without recording one.
	pub fn is_allowed(&self, namespace: &str, identity: &str) -> bool {
		if self.config.is_exempt(identity) {
			return true;
		}
		let key = Self::key(namespace, identity);
		match self.store.get(&key) {
			Ok(Some(count)) => count < self.config.max,
			Ok(None) => self.config.max > 0,
			Err(e) => {
				warn!("rate limit store unavailable, allowing {key}: {e}");
				true
			}
		}
	}
}

fn ceil_seconds(duration: Duration) -> u64 {
	duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
