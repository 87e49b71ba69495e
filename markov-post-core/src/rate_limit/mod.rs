//! Fixed-window rate limiting.
//!
//! - Counter store abstraction and its in-process implementation (`store`)
//! - The limiter itself, with fail-open degradation (`limiter`)

/// Expiring counters with an atomic check-then-increment primitive.
pub mod store;

/// Per-identity fixed-window limiter over a `CounterStore`.
pub mod limiter;

pub use limiter::{RateLimitResult, RateLimiter};
pub use store::{Clock, CounterStore, InMemoryCounterStore, StoreError, SystemClock, WindowHit};
