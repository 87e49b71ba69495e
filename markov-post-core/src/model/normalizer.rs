use std::sync::OnceLock;

use regex::Regex;

fn line_breaks() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("static regex"))
}

fn spaces() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r" {2,}").expect("static regex"))
}

/// Flattens extracted text blocks into a single sentence-terminated line.
///
/// - Blocks are concatenated, one per line
/// - Any run of `\r`/`\n` becomes a single line break
/// - Each line is trimmed, blank lines are dropped, and a `.` is appended
///   to lines that do not already end with one
/// - Lines are joined with a space and runs of spaces are collapsed
///
/// Empty or whitespace-only input yields an empty string. The function is
/// total and idempotent.
pub fn normalize<S: AsRef<str>>(raw: &[S]) -> String {
	let joined = raw.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
	let joined = line_breaks().replace_all(&joined, "\n");

	let lines: Vec<String> = joined
		.split('\n')
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(|line| {
			if line.ends_with('.') {
				line.to_owned()
			} else {
				format!("{line}.")
			}
		})
		.collect();

	spaces().replace_all(&lines.join(" "), " ").into_owned()
}
