use std::collections::HashSet;

use markov_post_core::config::{CountRange, GenerationConfig, SynthesisConfig};
use markov_post_core::model::synthesizer::synthesize;
use markov_post_core::model::token::Token;
use markov_post_core::model::transition_model::TransitionModel;
use markov_post_core::model::normalizer::normalize;
use markov_post_core::{generate_document, Generator, MarkovError};
use rand::SeedableRng;
use rand::rngs::StdRng;

const PROSE: &str = "The river runs past the old mill every spring.
The mill was built by a farmer who loved the river
A farmer in the valley grows wheat and barley every year.
Every spring the valley floods and the wheat grows tall
The old farmer walks to the mill at dawn.
At dawn the river is quiet and the valley is cold.";

fn permissive() -> GenerationConfig {
	GenerationConfig {
		synthesis: SynthesisConfig { max_overlap_ratio: 1.0, ..SynthesisConfig::default() },
		..GenerationConfig::default()
	}
}

#[test]
fn document_shape_stays_within_ranges() {
	let generator = Generator::from_corpus(&["The cat sat. The cat ran. The dog sat."], permissive()).unwrap();
	let mut rng = StdRng::seed_from_u64(1000);

	let mut paragraph_counts = HashSet::new();
	let mut sentence_counts = HashSet::new();
	for _ in 0..1000 {
		let document = generator.document(&mut rng).unwrap();
		assert!((4..=8).contains(&document.paragraph_count()));
		paragraph_counts.insert(document.paragraph_count());
		for paragraph in document.paragraphs() {
			assert!((2..=6).contains(&paragraph.len()));
			sentence_counts.insert(paragraph.len());
		}
	}

	assert_eq!(paragraph_counts, (4..=8).collect::<HashSet<_>>());
	assert_eq!(sentence_counts, (2..=6).collect::<HashSet<_>>());
}

#[test]
fn rendered_document_uses_blank_line_separators() {
	let config = GenerationConfig { paragraphs: CountRange(3, 3), sentences: CountRange(2, 2), ..permissive() };
	let mut rng = StdRng::seed_from_u64(1);
	let document = generate_document(&["The cat sat. The cat ran. The dog sat."], &config, &mut rng).unwrap();

	let rendered = document.to_string();
	let paragraphs: Vec<&str> = rendered.split("\n\n").collect();
	assert_eq!(paragraphs.len(), 3);
	assert!(paragraphs.iter().all(|p| !p.contains('\n')));
	assert!(paragraphs.iter().all(|p| p.starts_with("The ")));
}

#[test]
fn worked_example() {
	let model = TransitionModel::build("The cat sat. The cat ran. The dog sat.", 1).unwrap();
	let counts = model.successor_counts(&[Token::word("The")]);
	assert_eq!(counts.len(), 2);
	assert_eq!(counts[&Token::word("cat")], 2);
	assert_eq!(counts[&Token::word("dog")], 1);

	let mut rng = StdRng::seed_from_u64(9);
	let sentence = synthesize(&model, &permissive().synthesis, &mut rng).unwrap();
	assert!(sentence.starts_with("The"));
}

#[test]
fn no_dead_ends_from_begin() {
	let corpus = normalize(&[PROSE]);
	for order in 1..=3 {
		let model = TransitionModel::build(&corpus, order).unwrap();
		for state in model.states() {
			let successors = model.successors(state).unwrap();
			assert!(!successors.is_empty());
			for next in successors.iter().filter(|t| !t.is_end()) {
				let mut following = state[1..].to_vec();
				following.push(next.clone());
				assert!(model.successors(&following).is_some(), "dead end after {following:?}");
			}
		}
	}
}

#[test]
fn prose_generates_with_default_thresholds() {
	let config = GenerationConfig { paragraphs: CountRange(1, 2), sentences: CountRange(1, 3), ..GenerationConfig::default() };
	let mut rng = StdRng::seed_from_u64(77);
	let document = generate_document(&[PROSE], &config, &mut rng).unwrap();
	for sentence in document.paragraphs().iter().flatten() {
		assert!(sentence.split(' ').count() >= config.synthesis.min_tokens);
		assert!(sentence.chars().next().is_some_and(char::is_uppercase));
	}
}

#[test]
fn repeated_short_sentence_exhausts_the_budget() {
	let corpus = vec!["we are here."; 500].join(" ");
	let model = TransitionModel::build(&corpus, 1).unwrap();
	let config = SynthesisConfig::default();
	assert!(config.overlap_threshold(3) < 3);

	let mut rng = StdRng::seed_from_u64(500);
	assert!(matches!(
		synthesize(&model, &config, &mut rng),
		Err(MarkovError::SynthesisExhausted { attempts: 10_000 })
	));

	let err = generate_document(&[corpus.as_str()], &GenerationConfig::default(), &mut rng).unwrap_err();
	assert!(err.is_insufficient_material());
}

#[test]
fn empty_input_is_insufficient_material() {
	let mut rng = StdRng::seed_from_u64(0);
	let err = generate_document(&["", "  "], &GenerationConfig::default(), &mut rng).unwrap_err();
	assert!(matches!(err, MarkovError::EmptyCorpus));
	assert!(err.is_insufficient_material());
	assert!(matches!(TransitionModel::build("", 1), Err(MarkovError::EmptyCorpus)));
}
