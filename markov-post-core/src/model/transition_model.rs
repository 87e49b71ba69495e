use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::io::{build_output_path, read_file};
use super::normalizer::normalize;
use super::token::{split_sentences, Token};

/// Word-level Markov chain of order `k`.
///
/// Each state is the window of the last `k` tokens (padded with `Begin` at
/// the start of a sentence). For every state the model keeps the full
/// multiset of observed successors, so uniform sampling over that list is
/// sampling weighted by frequency.
///
/// The model also keeps the flat sequence of source words. The synthesizer
/// uses it to reject sentences that copy the corpus verbatim.
///
/// # Invariants
/// - `order >= 1`
/// - Every stored state has at least one successor
/// - Every state reachable from `begin_state()` is stored
///
/// Once built, a model is never mutated by generation and can be shared
/// freely across threads.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransitionModel {
	order: usize,
	transitions: HashMap<Vec<Token>, Vec<Token>>,
	source: Vec<String>,
}

impl TransitionModel {
	fn empty(order: usize) -> Result<Self> {
		if order == 0 {
			return Err(MarkovError::invalid_config("order must be >= 1"));
		}
		Ok(Self { order, transitions: HashMap::new(), source: Vec::new() })
	}

	/// Builds a model of the given order from normalized text.
	///
	/// # Errors
	/// - `EmptyCorpus` if the text holds no sentence
	/// - `InvalidConfig` if `order == 0`
	pub fn build(corpus: &str, order: usize) -> Result<Self> {
		let mut model = Self::empty(order)?;
		let sentences = split_sentences(corpus);
		if sentences.is_empty() {
			return Err(MarkovError::EmptyCorpus);
		}

		for sentence in &sentences {
			model.add_sentence(sentence);
		}
		model.source = sentences.into_iter().flatten().collect();

		debug!(
			"built order-{} model: {} states from {} words",
			model.order,
			model.transitions.len(),
			model.source.len()
		);
		Ok(model)
	}

	/// Same result as [`build`](Self::build), computed on worker threads.
	///
	/// Sentences are split into chunks (several per CPU), each chunk is
	/// learned by its own partial model, and partial models are merged as
	/// they come back over a channel. Worth it only for large corpora.
	pub fn build_parallel(corpus: &str, order: usize) -> Result<Self> {
		let mut model = Self::empty(order)?;
		let sentences = split_sentences(corpus);
		if sentences.is_empty() {
			return Err(MarkovError::EmptyCorpus);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = sentences.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		let mut expected = 0;
		thread::scope(|scope| {
			for chunk in sentences.chunks(chunk_size) {
				let tx = tx.clone();
				expected += 1;
				scope.spawn(move || {
					// order was validated above
					let mut partial = Self { order, transitions: HashMap::new(), source: Vec::new() };
					for sentence in chunk {
						partial.add_sentence(sentence);
					}
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		let mut received = 0;
		for partial in rx.iter() {
			model.merge(&partial)?;
			received += 1;
		}
		if received != expected {
			return Err(MarkovError::internal(format!(
				"expected {expected} partial models, received {received}"
			)));
		}

		model.source = sentences.into_iter().flatten().collect();
		debug!(
			"built order-{} model in {} chunks: {} states from {} words",
			model.order,
			expected,
			model.transitions.len(),
			model.source.len()
		);
		Ok(model)
	}

	/// Loads a model from a text file, using a binary cache when possible.
	///
	/// - The cache lives next to the text file with a `.bin` extension
	/// - A cache that is older than the text file, unreadable, or built with
	///   another order is ignored and overwritten
	/// - Otherwise the file is normalized, built in parallel and cached
	///   with `postcard`
	pub fn from_file<P: AsRef<Path>>(filepath: P, order: usize) -> Result<Self> {
		let binary_data_path = build_output_path(&filepath, "bin")?;
		if let Some(model) = Self::load_cache(filepath.as_ref(), &binary_data_path, order) {
			return Ok(model);
		}

		let lines = read_file(&filepath)?;
		let model = Self::build_parallel(&normalize(&lines), order)?;
		std::fs::write(&binary_data_path, postcard::to_stdvec(&model)?)?;
		Ok(model)
	}

	/// Returns the cached model if it is fresh, decodes, and has `order`.
	fn load_cache(text_path: &Path, cache_path: &Path, order: usize) -> Option<Self> {
		let cache_modified = std::fs::metadata(cache_path).and_then(|m| m.modified()).ok()?;
		if let Ok(text_modified) = std::fs::metadata(text_path).and_then(|m| m.modified()) {
			if text_modified > cache_modified {
				debug!("{} is newer than its cache, rebuilding", text_path.display());
				return None;
			}
		}

		let decoded = std::fs::read(cache_path)
			.map_err(MarkovError::from)
			.and_then(|bytes| postcard::from_bytes::<Self>(&bytes).map_err(MarkovError::from));
		match decoded {
			Ok(model) if model.order == order => {
				debug!("loaded cached model from {}", cache_path.display());
				Some(model)
			}
			Ok(_) => None,
			Err(e) => {
				warn!("ignoring unreadable model cache {}: {e}", cache_path.display());
				None
			}
		}
	}

	/// Records every `state -> successor` observation of one sentence.
	fn add_sentence(&mut self, words: &[String]) {
		let mut tokens = vec![Token::Begin; self.order];
		tokens.extend(words.iter().map(|w| Token::word(w.as_str())));
		tokens.push(Token::End);

		for window in tokens.windows(self.order + 1) {
			let (state, next) = window.split_at(self.order);
			self.transitions.entry(state.to_vec()).or_default().push(next[0].clone());
		}
	}

	/// Merges another model of the same order into this one.
	///
	/// Successor multisets are concatenated and source words appended.
	///
	/// # Errors
	/// Returns `InvalidConfig` if the orders differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(MarkovError::invalid_config(format!(
				"order mismatch: {} vs {}",
				self.order, other.order
			)));
		}

		for (state, successors) in &other.transitions {
			self.transitions.entry(state.clone()).or_default().extend(successors.iter().cloned());
		}
		self.source.extend(other.source.iter().cloned());
		Ok(())
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn state_count(&self) -> usize {
		self.transitions.len()
	}

	/// The all-`Begin` state every sentence starts from.
	pub fn begin_state(&self) -> Vec<Token> {
		vec![Token::Begin; self.order]
	}

	/// Every stored state.
	pub fn states(&self) -> impl Iterator<Item = &[Token]> {
		self.transitions.keys().map(Vec::as_slice)
	}

	/// Full successor multiset of a state, or `None` if it was never seen.
	pub fn successors(&self, state: &[Token]) -> Option<&[Token]> {
		self.transitions.get(state).map(Vec::as_slice)
	}

	/// Distinct successors of a state with their observation counts.
	pub fn successor_counts(&self, state: &[Token]) -> HashMap<&Token, usize> {
		let mut counts = HashMap::new();
		for token in self.successors(state).unwrap_or_default() {
			*counts.entry(token).or_insert(0) += 1;
		}
		counts
	}

	/// Samples the next token of `state`, weighted by observation count.
	///
	/// Returns `None` if the state is unknown.
	pub fn sample<R: Rng + ?Sized>(&self, state: &[Token], rng: &mut R) -> Option<&Token> {
		self.transitions.get(state)?.choose(rng)
	}

	/// Returns `true` if `run` appears verbatim in the source words.
	pub fn source_contains(&self, run: &[&str]) -> bool {
		if run.is_empty() {
			return true;
		}
		self.source
			.windows(run.len())
			.any(|window| window.iter().zip(run).all(|(a, b)| a == b))
	}

	/// Number of source words the model was built from.
	pub fn source_len(&self) -> usize {
		self.source.len()
	}
}
