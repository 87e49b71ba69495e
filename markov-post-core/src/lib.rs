//! Markov chain text synthesis with per-identity rate limiting.
//!
//! This crate provides:
//! - Corpus normalization and word-level Markov models of any order
//! - Constrained sentence synthesis (length and verbatim-overlap checks)
//! - Multi-paragraph document assembly with a hard attempt budget
//! - A fixed-window rate limiter that fails open when its store is down
//!
//! All randomness comes from a caller-supplied `rand::Rng`, and all
//! configuration is passed explicitly.

/// Normalization, transition models, synthesis and document assembly.
pub mod model;

/// Fixed-window rate limiter and counter stores.
pub mod rate_limit;

/// Explicit configuration with documented defaults.
pub mod config;

/// Error taxonomy shared by the engine.
pub mod error;

/// File helpers for the model cache.
pub(crate) mod io;

pub use config::Config;
pub use error::{MarkovError, Result};
pub use model::generator::{generate_document, Generator};
