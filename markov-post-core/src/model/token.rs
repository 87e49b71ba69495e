use std::fmt;

use serde::{Deserialize, Serialize};

/// A single symbol of the chain.
///
/// Words keep their attached punctuation (`"sat."`), so rendering a sentence
/// never has to re-space anything. `Begin` and `End` mark sentence boundaries
/// and are never rendered.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
	Begin,
	End,
	Word(String),
}

impl Token {
	pub fn word(value: impl Into<String>) -> Self {
		Token::Word(value.into())
	}

	/// Returns the word text, or `None` for boundary markers.
	pub fn as_word(&self) -> Option<&str> {
		match self {
			Token::Word(w) => Some(w),
			_ => None,
		}
	}

	pub fn is_end(&self) -> bool {
		matches!(self, Token::End)
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Begin => f.write_str("<BEGIN>"),
			Token::End => f.write_str("<END>"),
			Token::Word(w) => f.write_str(w),
		}
	}
}

/// Returns `true` when `word` closes a sentence.
pub(crate) fn ends_sentence(word: &str) -> bool {
	word.ends_with(['.', '!', '?'])
}

/// Splits normalized text into sentences of whitespace-delimited words.
///
/// A sentence ends at any word carrying terminal punctuation. Trailing words
/// without one still form a final sentence.
pub(crate) fn split_sentences(corpus: &str) -> Vec<Vec<String>> {
	let mut sentences = Vec::new();
	let mut current: Vec<String> = Vec::new();

	for word in corpus.split_whitespace() {
		current.push(word.to_owned());
		if ends_sentence(word) {
			sentences.push(std::mem::take(&mut current));
		}
	}
	if !current.is_empty() {
		sentences.push(current);
	}

	sentences
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_terminal_punctuation() {
		let sentences = split_sentences("The cat sat. Did it? Yes! trailing words");
		assert_eq!(
			sentences,
			vec![
				vec!["The", "cat", "sat."],
				vec!["Did", "it?"],
				vec!["Yes!"],
				vec!["trailing", "words"],
			]
		);
	}

	#[test]
	fn blank_corpus_has_no_sentences() {
		assert!(split_sentences("").is_empty());
		assert!(split_sentences(" \t ").is_empty());
	}

	#[test]
	fn display_words_only() {
		assert_eq!(Token::word("cat").to_string(), "cat");
		assert_eq!(Token::word("cat").as_word(), Some("cat"));
		assert_eq!(Token::End.as_word(), None);
	}
}
