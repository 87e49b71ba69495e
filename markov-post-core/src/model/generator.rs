use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use crate::config::GenerationConfig;
use crate::error::{MarkovError, Result};
use super::document::{assemble, GeneratedDocument};
use super::normalizer::normalize;
use super::transition_model::TransitionModel;

/// Builds a one-off model from raw text blocks and assembles a document.
///
/// This is the whole pipeline: normalize, build, assemble.
///
/// # Errors
/// - `EmptyCorpus` if the blocks hold no text
/// - `SynthesisExhausted` if the text is too poor to synthesize from
/// - `InvalidConfig` for out-of-range configuration
pub fn generate_document<S, R>(corpus: &[S], config: &GenerationConfig, rng: &mut R) -> Result<GeneratedDocument>
where
	S: AsRef<str>,
	R: Rng + ?Sized,
{
	config.validate()?;
	let normalized = normalize(corpus);
	if normalized.is_empty() {
		return Err(MarkovError::EmptyCorpus);
	}
	let model = TransitionModel::build(&normalized, config.order)?;
	assemble(&model, config, rng)
}

/// A built model paired with the configuration used to sample from it.
///
/// Cloning is cheap; clones share the same immutable model, so a generator
/// can be handed to as many threads as needed.
#[derive(Clone, Debug)]
pub struct Generator {
	model: Arc<TransitionModel>,
	config: GenerationConfig,
}

impl Generator {
	/// Normalizes `corpus` and builds a model for it.
	pub fn from_corpus<S: AsRef<str>>(corpus: &[S], config: GenerationConfig) -> Result<Self> {
		config.validate()?;
		let model = TransitionModel::build(&normalize(corpus), config.order)?;
		Ok(Self { model: Arc::new(model), config })
	}

	/// Loads (or builds and caches) the model of a text file.
	///
	/// See [`TransitionModel::from_file`].
	pub fn from_file<P: AsRef<Path>>(filepath: P, config: GenerationConfig) -> Result<Self> {
		config.validate()?;
		let model = TransitionModel::from_file(filepath, config.order)?;
		Ok(Self { model: Arc::new(model), config })
	}

	pub fn model(&self) -> &TransitionModel {
		&self.model
	}

	pub fn config(&self) -> &GenerationConfig {
		&self.config
	}

	/// Assembles a fresh document.
	pub fn document<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GeneratedDocument> {
		assemble(&self.model, &self.config, rng)
	}

	/// Synthesizes a single sentence.
	pub fn sentence<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
		super::synthesizer::synthesize(&self.model, &self.config.synthesis, rng)
	}
}
