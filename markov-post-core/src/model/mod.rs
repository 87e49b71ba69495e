//! Word-level Markov text synthesis.
//!
//! - Corpus normalization (`normalizer`)
//! - Tokens and sentence splitting (`token`)
//! - Order-k transition models (`transition_model`)
//! - Sentence synthesis under acceptance rules (`synthesizer`)
//! - Document assembly (`document`)
//! - The end-to-end entry points (`generator`)

/// Flattens raw text blocks into sentence-terminated text.
pub mod normalizer;

/// Tokens of the chain, including sentence boundary markers.
pub mod token;

/// Order-k Markov chain over words.
///
/// Supports sequential and parallel construction, merging,
/// weighted sampling and binary caching.
pub mod transition_model;

/// Walks the chain to produce one acceptable sentence.
pub mod synthesizer;

/// Paragraph and sentence layout of a generated document.
pub mod document;

/// High-level pipeline: raw text in, document out.
pub mod generator;
