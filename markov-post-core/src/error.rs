use thiserror::Error;

/// Errors produced by the text synthesis engine.
///
/// `EmptyCorpus` and `SynthesisExhausted` mean "not enough material" and are
/// expected outcomes for short inputs. `Internal` is reserved for faults that
/// should never happen on a well-formed model, so callers can tell the two
/// situations apart.
#[derive(Debug, Error)]
pub enum MarkovError {
	/// Normalization left nothing to tokenize.
	#[error("not enough text to generate from")]
	EmptyCorpus,

	/// No acceptable sentence was produced within the attempt budget.
	#[error("no acceptable sentence after {attempts} attempts")]
	SynthesisExhausted { attempts: usize },

	/// Order or range parameters are out of bounds.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A model invariant was broken during generation.
	#[error("internal error: {0}")]
	Internal(String),

	/// Model cache could not be read or written.
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// Model cache could not be (de)serialized.
	#[error("model serialization failed: {0}")]
	Serialization(#[from] postcard::Error),
}

impl MarkovError {
	/// Returns `true` for the errors a user should see as "couldn't generate".
	pub fn is_insufficient_material(&self) -> bool {
		matches!(self, MarkovError::EmptyCorpus | MarkovError::SynthesisExhausted { .. })
	}

	pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
		MarkovError::InvalidConfig(msg.into())
	}

	pub(crate) fn internal(msg: impl Into<String>) -> Self {
		MarkovError::Internal(msg.into())
	}
}

pub type Result<T> = std::result::Result<T, MarkovError>;
