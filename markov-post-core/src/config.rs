//! Explicit configuration consumed by the engine and the rate limiter.
//!
//! Nothing here reads the environment. Binaries deserialize a [`Config`]
//! (every field has a default) and hand the relevant section to each
//! component.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};

/// Inclusive `[min, max]` range, serialized as a two-element array.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountRange(pub usize, pub usize);

impl CountRange {
	pub fn min(&self) -> usize {
		self.0
	}

	pub fn max(&self) -> usize {
		self.1
	}

	fn validate(&self, what: &str) -> Result<()> {
		if self.0 == 0 {
			return Err(MarkovError::invalid_config(format!("{what} range must start at 1 or more")));
		}
		if self.0 > self.1 {
			return Err(MarkovError::invalid_config(format!(
				"{what} range is empty: [{}, {}]",
				self.0, self.1
			)));
		}
		Ok(())
	}
}

/// Acceptance thresholds for a single synthesized sentence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
	/// Hard ceiling on attempts per sentence. Every rejection counts.
	pub max_attempts: usize,
	/// Shortest acceptable sentence, in tokens.
	pub min_tokens: usize,
	/// Longest walk before an attempt is abandoned.
	pub max_tokens: usize,
	/// Share of the sentence length that may be copied verbatim from the source.
	pub max_overlap_ratio: f64,
	/// Absolute cap on the verbatim run, whatever the sentence length.
	pub max_overlap_total: usize,
}

impl Default for SynthesisConfig {
	fn default() -> Self {
		Self {
			max_attempts: 10_000,
			min_tokens: 2,
			max_tokens: 1_000,
			max_overlap_ratio: 0.7,
			max_overlap_total: 15,
		}
	}
}

impl SynthesisConfig {
	/// Longest run of source tokens a sentence of `len` tokens may share.
	pub fn overlap_threshold(&self, len: usize) -> usize {
		let by_ratio = (self.max_overlap_ratio * len as f64).round() as usize;
		by_ratio.min(self.max_overlap_total)
	}
}

/// Chain order and document shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
	pub order: usize,
	pub paragraphs: CountRange,
	pub sentences: CountRange,
	pub synthesis: SynthesisConfig,
}

impl Default for GenerationConfig {
	fn default() -> Self {
		Self {
			order: 1,
			paragraphs: CountRange(4, 8),
			sentences: CountRange(2, 6),
			synthesis: SynthesisConfig::default(),
		}
	}
}

impl GenerationConfig {
	pub fn validate(&self) -> Result<()> {
		if self.order == 0 {
			return Err(MarkovError::invalid_config("order must be >= 1"));
		}
		if self.synthesis.max_attempts == 0 {
			return Err(MarkovError::invalid_config("max_attempts must be >= 1"));
		}
		if !(0.0..=1.0).contains(&self.synthesis.max_overlap_ratio) {
			return Err(MarkovError::invalid_config("max_overlap_ratio must be between 0.0 and 1.0"));
		}
		self.paragraphs.validate("paragraph")?;
		self.sentences.validate("sentence")
	}
}

/// Fixed-window quota applied per identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
	pub max: u64,
	pub window_seconds: u64,
	/// Identities that are never throttled.
	pub exempt: HashSet<String>,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self { max: 50, window_seconds: 600, exempt: HashSet::new() }
	}
}

impl RateLimitConfig {
	pub fn window(&self) -> Duration {
		Duration::from_secs(self.window_seconds)
	}

	pub fn is_exempt(&self, identity: &str) -> bool {
		self.exempt.contains(identity)
	}
}

/// Top-level configuration container.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
	pub generation: GenerationConfig,
	pub rate_limit: RateLimitConfig,
}

impl Config {
	pub fn validate(&self) -> Result<()> {
		self.generation.validate()
	}
}
