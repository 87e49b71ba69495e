use std::fmt;

use rand::Rng;

use crate::config::GenerationConfig;
use crate::error::Result;
use super::synthesizer::synthesize;
use super::transition_model::TransitionModel;

/// A synthesized multi-paragraph document.
///
/// Rendered with `Display`: sentences of a paragraph are joined by a space,
/// paragraphs by a blank line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedDocument {
	paragraphs: Vec<Vec<String>>,
}

impl GeneratedDocument {
	/// Sentences of every paragraph, in order.
	pub fn paragraphs(&self) -> &[Vec<String>] {
		&self.paragraphs
	}

	pub fn paragraph_count(&self) -> usize {
		self.paragraphs.len()
	}
}

impl fmt::Display for GeneratedDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, paragraph) in self.paragraphs.iter().enumerate() {
			if i > 0 {
				f.write_str("\n\n")?;
			}
			f.write_str(&paragraph.join(" "))?;
		}
		Ok(())
	}
}

/// Assembles a document of random shape from the model.
///
/// The paragraph count and each paragraph's sentence count are drawn
/// uniformly from the configured inclusive ranges. Sentences are synthesized
/// independently; repeats are allowed.
///
/// # Errors
/// - `InvalidConfig` if the configuration does not validate
/// - Any synthesis error, unchanged. A single failed sentence aborts the
///   whole document.
pub fn assemble<R: Rng + ?Sized>(
	model: &TransitionModel,
	config: &GenerationConfig,
	rng: &mut R,
) -> Result<GeneratedDocument> {
	config.validate()?;

	let paragraph_count = rng.random_range(config.paragraphs.min()..=config.paragraphs.max());
	let mut paragraphs = Vec::with_capacity(paragraph_count);
	for _ in 0..paragraph_count {
		let sentence_count = rng.random_range(config.sentences.min()..=config.sentences.max());
		let sentences = (0..sentence_count)
			.map(|_| synthesize(model, &config.synthesis, rng))
			.collect::<Result<Vec<_>>>()?;
		paragraphs.push(sentences);
	}

	Ok(GeneratedDocument { paragraphs })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{CountRange, SynthesisConfig};
	use crate::error::MarkovError;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn renders_paragraphs_and_sentences() {
		let document = GeneratedDocument {
			paragraphs: vec![
				vec!["One.".to_owned(), "Two.".to_owned()],
				vec!["Three.".to_owned()],
			],
		};
		assert_eq!(document.to_string(), "One. Two.\n\nThree.");
		assert_eq!(document.paragraph_count(), 2);
	}

	#[test]
	fn fixed_shape() {
		let model = TransitionModel::build("The cat sat. The cat ran. The dog sat.", 1).unwrap();
		let config = GenerationConfig {
			paragraphs: CountRange(2, 2),
			sentences: CountRange(3, 3),
			synthesis: SynthesisConfig { max_overlap_ratio: 1.0, ..SynthesisConfig::default() },
			..GenerationConfig::default()
		};
		let mut rng = StdRng::seed_from_u64(11);
		let document = assemble(&model, &config, &mut rng).unwrap();
		assert_eq!(document.paragraph_count(), 2);
		assert!(document.paragraphs().iter().all(|p| p.len() == 3));
		assert_eq!(document.to_string().matches("\n\n").count(), 1);
	}

	#[test]
	fn one_failed_sentence_fails_the_document() {
		let corpus = vec!["tiny little corpus."; 20].join(" ");
		let model = TransitionModel::build(&corpus, 1).unwrap();
		let config = GenerationConfig {
			synthesis: SynthesisConfig { max_attempts: 25, ..SynthesisConfig::default() },
			..GenerationConfig::default()
		};
		let mut rng = StdRng::seed_from_u64(12);
		assert!(matches!(
			assemble(&model, &config, &mut rng),
			Err(MarkovError::SynthesisExhausted { attempts: 25 })
		));
	}

	#[test]
	fn invalid_ranges_are_reported() {
		let model = TransitionModel::build("The cat sat.", 1).unwrap();
		let config = GenerationConfig { paragraphs: CountRange(3, 1), ..GenerationConfig::default() };
		let mut rng = StdRng::seed_from_u64(13);
		assert!(matches!(assemble(&model, &config, &mut rng), Err(MarkovError::InvalidConfig(_))));
	}
}
