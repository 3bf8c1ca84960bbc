use crate::rules::replacer::{RuleState, StatefulReplacer};
use regex::Captures;

/// Placeholder substituted with the current counter value.
pub const COUNTER_PLACEHOLDER: &str = "{n}";

/// Counter replacer: emits a templated value and increments once per match.
///
/// The template is expanded like a fixed template (`$0`, `$1`, `${name}`) and
/// every `{n}` is replaced by the current value. Values are gapless across the
/// whole run as long as failed units are rolled back.
#[derive(Debug, Clone)]
pub struct Counter {
	start: i64,
	template: String,
	/// Template split around `{n}`, so captured text is never scanned for it.
	pieces: Vec<String>,
}

impl Counter {
	pub fn new(start: i64, template: impl Into<String>) -> Self {
		let template = template.into();
		let pieces = template
			.split(COUNTER_PLACEHOLDER)
			.map(str::to_string)
			.collect();
		Self {
			start,
			template,
			pieces,
		}
	}

	pub fn start(&self) -> i64 {
		self.start
	}

	pub fn template(&self) -> &str {
		&self.template
	}

	fn render(&self, caps: &Captures<'_>, value: i64) -> String {
		let value = value.to_string();
		let mut out = String::new();
		for (i, piece) in self.pieces.iter().enumerate() {
			if i > 0 {
				out.push_str(&value);
			}
			caps.expand(piece, &mut out);
		}
		out
	}
}

impl StatefulReplacer for Counter {
	fn initial_state(&self) -> RuleState {
		RuleState::Integer(self.start)
	}

	fn replace(&self, caps: &Captures<'_>, state: &mut RuleState) -> Result<String, String> {
		let current = match state {
			RuleState::Integer(value) => *value,
			RuleState::Exhausted => return Err(format!("counter exhausted after {}", i64::MAX)),
			RuleState::Text(_) => {
				return Err(format!("counter state is not an integer: {:?}", state));
			}
		};
		let text = self.render(caps, current);
		*state = match current.checked_add(1) {
			Some(next) => RuleState::Integer(next),
			None => RuleState::Exhausted,
		};
		Ok(text)
	}
}
