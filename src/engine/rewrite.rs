use crate::engine::record::{RuleHits, UnitError, UnitRecord};
use crate::engine::state::RunState;
use crate::error::{RekitError, Result};
use crate::rules::{Replacer, Rule, RuleSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happens to a unit when one of its rules fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
	/// The unit is atomic: return the original buffer and rewind the run state
	/// to where it was before the unit started.
	#[default]
	RollbackUnit,

	/// Keep earlier rules' effects, discard only the failing rule's effects for
	/// this unit, and continue with the next rule.
	SkipRule,
}

impl FailurePolicy {
	pub fn as_str(&self) -> &'static str {
		match self {
			FailurePolicy::RollbackUnit => "rollback-unit",
			FailurePolicy::SkipRule => "skip-rule",
		}
	}
}

impl fmt::Display for FailurePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for FailurePolicy {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"rollback-unit" => Ok(FailurePolicy::RollbackUnit),
			"skip-rule" => Ok(FailurePolicy::SkipRule),
			other => Err(format!(
				"unknown failure policy '{}' (expected rollback-unit or skip-rule)",
				other
			)),
		}
	}
}

/// Output of rewriting one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
	/// Buffer after every rule ran (or the original buffer after a rollback).
	pub content: String,
	pub record: UnitRecord,
}

/// Applies a rule set to one buffer at a time.
///
/// The engine is stateless between calls; everything that must survive from
/// one unit to the next lives in the caller's [`RunState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteEngine {
	policy: FailurePolicy,
}

impl RewriteEngine {
	pub fn new(policy: FailurePolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> FailurePolicy {
		self.policy
	}

	/// Apply `rules` in order to `buffer`.
	///
	/// Each rule sees the buffer as left by the rules before it. Stateful
	/// replacers update `state` once per match, left to right, so a counter
	/// keeps counting across every unit of the run.
	pub fn apply(&self, unit_id: &str, buffer: &str, rules: &RuleSet, state: &mut RunState) -> Rewritten {
		let snapshot = state.clone();
		let mut record = UnitRecord::new(unit_id);
		let mut current: Option<String> = None;

		for rule in rules {
			let haystack = current.as_deref().unwrap_or(buffer);
			let previous = match rule.replacer() {
				Replacer::Stateful(_) => state.get(rule.id()).cloned(),
				Replacer::Template(_) => None,
			};

			match apply_rule(rule, haystack, state) {
				Ok((rewritten, match_count)) => {
					if match_count > 0 {
						tracing::debug!(unit = unit_id, rule = rule.id(), match_count, "rule matched");
					}
					if let Some(rewritten) = rewritten {
						current = Some(rewritten);
					}
					record.rules.push(RuleHits {
						rule_id: rule.id().to_string(),
						match_count,
					});
				}
				Err(err) => {
					tracing::warn!(unit = unit_id, policy = %self.policy, "{}", err);
					let error = UnitError::from_error(&err);
					match self.policy {
						FailurePolicy::RollbackUnit => {
							*state = snapshot;
							return Rewritten {
								content: buffer.to_string(),
								record: UnitRecord::failed(unit_id, error),
							};
						}
						FailurePolicy::SkipRule => {
							if rule.replacer().is_stateful() {
								state.restore(rule.id(), previous);
							}
							record.rules.push(RuleHits {
								rule_id: rule.id().to_string(),
								match_count: 0,
							});
							record.errors.push(error);
						}
					}
				}
			}
		}

		let content = current.unwrap_or_else(|| buffer.to_string());
		record.modified = content != buffer;

		Rewritten { content, record }
	}
}

/// Rewrite every match of one rule (up to its limit).
///
/// Returns `None` for the buffer when nothing matched, so untouched units are
/// never copied.
fn apply_rule(rule: &Rule, haystack: &str, state: &mut RunState) -> Result<(Option<String>, usize)> {
	let limit = rule.limit().unwrap_or(usize::MAX);
	let mut out = String::with_capacity(haystack.len());
	let mut last = 0;
	let mut match_count = 0;

	for caps in rule.pattern().captures_iter(haystack).take(limit) {
		let Some(whole) = caps.get(0) else {
			continue;
		};
		out.push_str(&haystack[last..whole.start()]);

		match rule.replacer() {
			Replacer::Template(template) => caps.expand(template, &mut out),
			Replacer::Stateful(replacer) => {
				let slot = state.slot(rule.id(), replacer.as_ref());
				let text = replacer
					.replace(&caps, slot)
					.map_err(|message| RekitError::Rewrite {
						rule_id: rule.id().to_string(),
						match_index: match_count + 1,
						message,
					})?;
				out.push_str(&text);
			}
		}

		last = whole.end();
		match_count += 1;
	}

	if match_count == 0 {
		return Ok((None, 0));
	}

	out.push_str(&haystack[last..]);
	Ok((Some(out), match_count))
}
