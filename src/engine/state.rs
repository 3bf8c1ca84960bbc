use crate::rules::{RuleSet, RuleState, StatefulReplacer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All rule-local state carried across one run, keyed by rule id.
///
/// The engine holds no state of its own: callers create one `RunState` per run
/// and hand it to every `apply` call. Cloning it is the snapshot used for
/// per-unit rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState {
	states: BTreeMap<String, RuleState>,
}

impl RunState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fresh state seeded with every stateful rule's initial value.
	pub fn for_rules(rules: &RuleSet) -> Self {
		let states = rules
			.initial_states()
			.map(|(id, state)| (id.to_string(), state))
			.collect();
		Self { states }
	}

	pub fn get(&self, rule_id: &str) -> Option<&RuleState> {
		self.states.get(rule_id)
	}

	/// Override the state of one rule, e.g. to resume a run from a saved value.
	pub fn set(&mut self, rule_id: impl Into<String>, state: RuleState) {
		self.states.insert(rule_id.into(), state);
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleState)> {
		self.states.iter().map(|(id, state)| (id.as_str(), state))
	}

	/// State slot for a rule, seeded lazily if the caller did not seed it.
	pub(crate) fn slot(&mut self, rule_id: &str, replacer: &dyn StatefulReplacer) -> &mut RuleState {
		self.states
			.entry(rule_id.to_string())
			.or_insert_with(|| replacer.initial_state())
	}

	/// Put one rule's state back to an earlier value (`None` = it had none).
	pub(crate) fn restore(&mut self, rule_id: &str, previous: Option<RuleState>) {
		match previous {
			Some(state) => {
				self.states.insert(rule_id.to_string(), state);
			}
			None => {
				self.states.remove(rule_id);
			}
		}
	}
}
