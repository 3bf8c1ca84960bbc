use crate::error::{RekitError, Result};
use regex::{Regex, RegexBuilder};

/// Parsed substitution command (sed-like syntax).
#[derive(Debug)]
pub struct Substitution {
	/// The pattern to match.
	pub pattern: Regex,

	/// The replacement template (`$1`, `${name}` capture references).
	pub replacement: String,

	/// Whether to replace all occurrences (global flag).
	pub global: bool,
}

impl Substitution {
	/// Parse a substitution string in sed-like format: "s/pattern/replacement/" or
	/// "s/pattern/replacement/gi". Any character after the leading `s` is taken as
	/// the delimiter.
	///
	/// Supported flags: `g` (all matches) and `i` (case-insensitive).
	pub fn parse(rule_id: &str, input: &str) -> Result<Self> {
		let invalid = |reason: &str| RekitError::InvalidSubstitution {
			rule_id: rule_id.to_string(),
			input: input.to_string(),
			reason: reason.to_string(),
		};

		let mut chars = input.chars();
		if chars.next() != Some('s') {
			return Err(invalid("substitution must start with 's'"));
		}

		let delimiter = chars.next().ok_or_else(|| invalid("substitution too short"))?;
		if delimiter.is_alphanumeric() || delimiter == '\\' {
			return Err(invalid("delimiter must be a punctuation character"));
		}

		let body = &input[1 + delimiter.len_utf8()..];
		let parts = split_by_delimiter(body, delimiter);

		match parts.len() {
			0..=1 => return Err(invalid("substitution must have pattern and replacement")),
			2 => return Err(invalid("missing closing delimiter")),
			3 => {}
			_ => return Err(invalid("too many delimiters")),
		}

		let pattern_str = &parts[0];
		let replacement = parts[1].clone();
		let flags = &parts[2];

		let mut global = false;
		let mut case_insensitive = false;
		for flag in flags.chars() {
			match flag {
				'g' => global = true,
				'i' => case_insensitive = true,
				_ => return Err(invalid(&format!("unknown flag '{}'", flag))),
			}
		}

		let pattern = RegexBuilder::new(pattern_str)
			.case_insensitive(case_insensitive)
			.build()
			.map_err(|source| RekitError::InvalidRegex {
				rule_id: rule_id.to_string(),
				pattern: pattern_str.to_string(),
				source,
			})?;

		Ok(Substitution {
			pattern,
			replacement,
			global,
		})
	}

	/// Per-unit match limit implied by the flags.
	pub fn limit(&self) -> Option<usize> {
		if self.global { None } else { Some(1) }
	}
}

/// Split a string by a delimiter, respecting backslash escapes.
///
/// An escaped delimiter loses its backslash; every other escape is kept as-is
/// so regex escapes like `\s` survive.
fn split_by_delimiter(input: &str, delimiter: char) -> Vec<String> {
	let mut parts = Vec::new();
	let mut current = String::new();
	let mut chars = input.chars().peekable();

	while let Some(c) = chars.next() {
		if c == '\\' {
			if chars.peek() == Some(&delimiter) {
				current.push(delimiter);
				chars.next();
			} else {
				current.push(c);
				if let Some(next) = chars.next() {
					current.push(next);
				}
			}
		} else if c == delimiter {
			parts.push(std::mem::take(&mut current));
		} else {
			current.push(c);
		}
	}

	parts.push(current);
	parts
}
