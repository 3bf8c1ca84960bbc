use crate::config::types::{Config, RuleConfig};
use crate::error::{RekitError, Result};
use crate::rules::counter::Counter;
use crate::rules::replacer::{Replacer, RuleState, StatefulReplacer};
use crate::rules::substitution::Substitution;
use regex::Regex;
use std::collections::HashSet;

/// A compiled rewrite rule: matcher plus replacer.
#[derive(Debug)]
pub struct Rule {
	id: String,
	pattern: Regex,
	replacer: Replacer,
	limit: Option<usize>,
}

impl Rule {
	/// Rule with a fixed replacement template.
	pub fn template(id: impl Into<String>, pattern: &str, template: impl Into<String>) -> Result<Self> {
		let id = id.into();
		let pattern = compile_regex(&id, pattern)?;
		Ok(Self::from_regex(id, pattern, Replacer::Template(template.into())))
	}

	/// Rule with a stateful replacer.
	pub fn stateful<R>(id: impl Into<String>, pattern: &str, replacer: R) -> Result<Self>
	where
		R: StatefulReplacer + 'static,
	{
		let id = id.into();
		let pattern = compile_regex(&id, pattern)?;
		Ok(Self::from_regex(
			id,
			pattern,
			Replacer::Stateful(Box::new(replacer)),
		))
	}

	/// Rule from a sed-like substitution (`s/pattern/replacement/flags`).
	pub fn substitution(id: impl Into<String>, input: &str) -> Result<Self> {
		let id = id.into();
		let sub = Substitution::parse(&id, input)?;
		let limit = sub.limit();
		let mut rule = Self::from_regex(id, sub.pattern, Replacer::Template(sub.replacement));
		rule.limit = limit;
		Ok(rule)
	}

	pub fn from_regex(id: impl Into<String>, pattern: Regex, replacer: Replacer) -> Self {
		Self {
			id: id.into(),
			pattern,
			replacer,
			limit: None,
		}
	}

	/// Rewrite at most `limit` matches per unit.
	pub fn with_limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn pattern(&self) -> &Regex {
		&self.pattern
	}

	pub fn replacer(&self) -> &Replacer {
		&self.replacer
	}

	pub fn limit(&self) -> Option<usize> {
		self.limit
	}

	/// Compile a rule from its config form.
	pub fn from_config(config: &RuleConfig) -> Result<Self> {
		config.validate()?;

		let rule = if let Some(ref sub) = config.sub {
			Self::substitution(&config.id, sub)?
		} else {
			// validate() guarantees a pattern for template and counter rules
			let pattern = config.pattern.as_deref().unwrap_or_default();
			if let Some(ref counter) = config.counter {
				Self::stateful(
					&config.id,
					pattern,
					Counter::new(counter.start, counter.template.clone()),
				)?
			} else {
				Self::template(
					&config.id,
					pattern,
					config.template.clone().unwrap_or_default(),
				)?
			}
		};

		Ok(match config.limit {
			Some(limit) => rule.with_limit(limit),
			None => rule,
		})
	}
}

/// An ordered, validated set of rules.
///
/// There are no mutators: once built, the set can only be read, so it can be
/// shared freely while a run is in progress.
#[derive(Debug)]
pub struct RuleSet {
	rules: Vec<Rule>,
}

impl RuleSet {
	/// Validate and freeze a list of rules. Rule ids must be non-empty and unique.
	pub fn new(rules: Vec<Rule>) -> Result<Self> {
		let mut seen = HashSet::new();
		for rule in &rules {
			if rule.id.trim().is_empty() {
				return Err(RekitError::InvalidRule {
					rule_id: rule.id.clone(),
					reason: "rule id must not be empty".to_string(),
				});
			}
			if !seen.insert(rule.id.as_str()) {
				return Err(RekitError::DuplicateRuleId {
					rule_id: rule.id.clone(),
				});
			}
		}
		Ok(Self { rules })
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
		self.rules.iter()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	pub fn get(&self, id: &str) -> Option<&Rule> {
		self.rules.iter().find(|rule| rule.id == id)
	}

	/// Initial state of every stateful rule, in rule order.
	pub fn initial_states(&self) -> impl Iterator<Item = (&str, RuleState)> + '_ {
		self.rules.iter().filter_map(|rule| match rule.replacer {
			Replacer::Stateful(ref replacer) => Some((rule.id.as_str(), replacer.initial_state())),
			Replacer::Template(_) => None,
		})
	}
}

impl<'a> IntoIterator for &'a RuleSet {
	type Item = &'a Rule;
	type IntoIter = std::slice::Iter<'a, Rule>;

	fn into_iter(self) -> Self::IntoIter {
		self.rules.iter()
	}
}

/// Compile a regex pattern string.
fn compile_regex(rule_id: &str, pattern: &str) -> Result<Regex> {
	Regex::new(pattern).map_err(|source| RekitError::InvalidRegex {
		rule_id: rule_id.to_string(),
		pattern: pattern.to_string(),
		source,
	})
}

/// Compile all rules in a config into a validated rule set.
pub fn compile_rules(config: &Config) -> Result<RuleSet> {
	let rules = config
		.rules
		.iter()
		.map(Rule::from_config)
		.collect::<Result<Vec<_>>>()?;
	RuleSet::new(rules)
}
