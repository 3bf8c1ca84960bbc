use regex::Captures;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Private state of one stateful rule, carried across every match of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleState {
	Integer(i64),
	Text(String),
	/// The replacer has no further values to hand out (serialized as `null`).
	Exhausted,
}

/// A replacer whose output depends on, and updates, state carried across
/// matches and units.
///
/// Implementations must not hold mutable state of their own: everything that
/// changes between calls lives in the [`RuleState`] handed to [`replace`],
/// which the engine snapshots and restores around failed units.
///
/// [`replace`]: StatefulReplacer::replace
pub trait StatefulReplacer: fmt::Debug + Send + Sync {
	/// State seeded into a fresh run.
	fn initial_state(&self) -> RuleState;

	/// Produce the replacement for one match, updating `state`.
	///
	/// Returning `Err` fails the rule at this match; the message ends up in the
	/// unit's change record.
	fn replace(&self, caps: &Captures<'_>, state: &mut RuleState) -> Result<String, String>;
}

/// How a rule turns a match into replacement text.
#[derive(Debug)]
pub enum Replacer {
	/// Fixed template; may reference capture groups (`$1`, `${name}`).
	Template(String),

	/// Stateful function invoked once per match.
	Stateful(Box<dyn StatefulReplacer>),
}

impl Replacer {
	pub fn is_stateful(&self) -> bool {
		matches!(self, Replacer::Stateful(_))
	}
}

type ReplaceFn = dyn Fn(&Captures<'_>, &mut RuleState) -> Result<String, String> + Send + Sync;

/// Stateful replacer backed by a closure.
pub struct FnReplacer {
	initial: RuleState,
	func: Box<ReplaceFn>,
}

impl FnReplacer {
	pub fn new<F>(initial: RuleState, func: F) -> Self
	where
		F: Fn(&Captures<'_>, &mut RuleState) -> Result<String, String> + Send + Sync + 'static,
	{
		Self {
			initial,
			func: Box::new(func),
		}
	}
}

impl fmt::Debug for FnReplacer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnReplacer")
			.field("initial", &self.initial)
			.finish_non_exhaustive()
	}
}

impl StatefulReplacer for FnReplacer {
	fn initial_state(&self) -> RuleState {
		self.initial.clone()
	}

	fn replace(&self, caps: &Captures<'_>, state: &mut RuleState) -> Result<String, String> {
		(self.func)(caps, state)
	}
}
