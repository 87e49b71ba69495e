use std::sync::Arc;
use std::thread;
use std::time::Duration;

use markov_post_core::config::RateLimitConfig;
use markov_post_core::rate_limit::{CounterStore, InMemoryCounterStore, RateLimitResult, RateLimiter};

#[test]
fn sequential_hits_report_quota() {
	let limiter = RateLimiter::in_memory(RateLimitConfig::default());
	let window = Duration::from_secs(60);

	let results: Vec<RateLimitResult> = (0..4).map(|_| limiter.hit("telegram", "1234", 3, window)).collect();
	assert_eq!(
		results.iter().map(|r| (r.allowed, r.left)).collect::<Vec<_>>(),
		vec![(true, 2), (true, 1), (true, 0), (false, 0)]
	);
}

#[test]
fn parallel_hits_share_one_counter() {
	let store = Arc::new(InMemoryCounterStore::new());
	let limiter = RateLimiter::new(store.clone(), RateLimitConfig { max: 50, ..RateLimitConfig::default() });

	let outcomes: Vec<bool> = thread::scope(|scope| {
		let handles: Vec<_> = (0..100).map(|_| scope.spawn(|| limiter.check("http", "hot").allowed)).collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert_eq!(outcomes.iter().filter(|a| **a).count(), 50);
	assert_eq!(outcomes.iter().filter(|a| !**a).count(), 50);
	assert_eq!(store.get("rate_limit:http:hot").unwrap(), Some(50));
}

#[test]
fn limiter_clones_share_state() {
	let limiter = RateLimiter::in_memory(RateLimitConfig { max: 1, ..RateLimitConfig::default() });
	let other = limiter.clone();
	assert!(limiter.check("http", "x").allowed);
	assert!(!other.check("http", "x").allowed);
}
