use log::debug;
use rand::Rng;

use crate::config::SynthesisConfig;
use crate::error::{MarkovError, Result};
use super::token::Token;
use super::transition_model::TransitionModel;

/// Synthesizes one sentence from the chain.
///
/// Each attempt walks from the `Begin` state until `End` is sampled. An
/// attempt is rejected when:
/// - it has fewer than `min_tokens` words,
/// - the walk exceeds `max_tokens` words,
/// - it copies a run of source words longer than the overlap threshold.
///
/// Every rejection consumes one of `max_attempts`, so the call always
/// terminates.
///
/// # Errors
/// - `SynthesisExhausted` when the budget is spent
/// - `Internal` when the walk reaches a state with no successor
pub fn synthesize<R: Rng + ?Sized>(model: &TransitionModel, config: &SynthesisConfig, rng: &mut R) -> Result<String> {
	for _ in 0..config.max_attempts {
		let Some(words) = walk(model, config.max_tokens, rng)? else {
			continue;
		};
		if accept(model, config, &words) {
			return Ok(render(&words));
		}
	}

	debug!("synthesis exhausted after {} attempts", config.max_attempts);
	Err(MarkovError::SynthesisExhausted { attempts: config.max_attempts })
}

/// Walks the chain once. Returns `None` if the walk grew past `max_tokens`.
fn walk<'m, R: Rng + ?Sized>(
	model: &'m TransitionModel,
	max_tokens: usize,
	rng: &mut R,
) -> Result<Option<Vec<&'m str>>> {
	let mut state = model.begin_state();
	let mut words = Vec::new();

	loop {
		let next = model
			.sample(&state, rng)
			.ok_or_else(|| MarkovError::internal(format!("state {state:?} has no successor")))?;

		let word = match next {
			Token::End => return Ok(Some(words)),
			Token::Begin => return Err(MarkovError::internal("begin marker sampled inside a sentence")),
			Token::Word(word) => word,
		};
		if words.len() >= max_tokens {
			return Ok(None);
		}
		words.push(word.as_str());

		state.rotate_left(1);
		if let Some(last) = state.last_mut() {
			*last = next.clone();
		}
	}
}

fn accept(model: &TransitionModel, config: &SynthesisConfig, words: &[&str]) -> bool {
	if words.len() < config.min_tokens {
		return false;
	}

	// A run longer than the threshold must not appear in the source.
	let threshold = config.overlap_threshold(words.len());
	if threshold >= words.len() {
		return true;
	}
	!words.windows(threshold + 1).any(|run| model.source_contains(run))
}

/// Joins words with single spaces and upper-cases the first character.
fn render(words: &[&str]) -> String {
	let sentence = words.join(" ");
	let mut chars = sentence.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => sentence,
	}
}
