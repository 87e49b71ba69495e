//! User-facing reply texts and formatting helpers.

pub const HELP_MESSAGE: &str =
	"Just input anything and I'll generate some random text using it as a basis.";
pub const INVALID_COMMAND: &str = "I don't know what you mean by that. If you need help, use /help.";
pub const NOT_ENOUGH_TEXT: &str =
	"There isn't enough text there for me to generate a proper shitpost for you.";
pub const INTERNAL_ERROR: &str = "Sorry, try again.";

/// Longest reply a chat client accepts.
pub const MAX_REPLY_CHARS: usize = 4096;

/// Returns the command name if `text` is a `/command`.
///
/// `"/help me"` → `Some("help")`
pub fn parse_command(text: &str) -> Option<&str> {
	let rest = text.strip_prefix('/')?;
	Some(rest.split(' ').next().unwrap_or_default())
}

/// Reply to a `/command`.
pub fn command_reply(command: &str) -> &'static str {
	match command {
		"help" | "start" => HELP_MESSAGE,
		_ => INVALID_COMMAND,
	}
}

/// Cuts `text` to `max_chars` characters, ending with `…` when cut.
pub fn ellipsis(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_owned();
	}
	let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
	out.push('…');
	out
}

/// Renders a number of seconds as a phrase: `"9 minutes and 5 seconds"`.
pub fn human_duration(seconds: u64) -> String {
	if seconds == 0 {
		return "a moment".to_owned();
	}

	let units = [(seconds / 3600, "hour"), (seconds % 3600 / 60, "minute"), (seconds % 60, "second")];
	let parts: Vec<String> = units
		.iter()
		.filter(|(n, _)| *n > 0)
		.map(|(n, unit)| if *n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") })
		.collect();

	match parts.split_last() {
		Some((last, [])) => last.clone(),
		Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
		None => "a moment".to_owned(),
	}
}

/// Reply sent to a throttled caller.
pub fn throttled(reset_seconds: u64) -> String {
	format!("Not so fast! Try again in {}.", human_duration(reset_seconds))
}
