//! Change records produced by a run.

use crate::error::RekitError;
use serde::Serialize;
use std::fmt;

/// Number of matches one rule rewrote in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHits {
	pub rule_id: String,
	pub match_count: usize,
}

/// Why a unit did not complete cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitError {
	/// A replacer failed on a specific match (1-based index).
	Rewrite {
		rule_id: String,
		match_index: usize,
		message: String,
	},
	/// The unit could not be read or decoded.
	Read { message: String },
	/// The rewritten unit (or its backup) could not be written.
	Persistence { message: String },
}

impl UnitError {
	/// Convert a per-unit error into its record form, keeping the source chain.
	pub fn from_error(err: &RekitError) -> Self {
		match err {
			RekitError::Rewrite {
				rule_id,
				match_index,
				message,
			} => UnitError::Rewrite {
				rule_id: rule_id.clone(),
				match_index: *match_index,
				message: message.clone(),
			},
			RekitError::Read { .. } => UnitError::Read {
				message: error_chain(err),
			},
			_ => UnitError::Persistence {
				message: error_chain(err),
			},
		}
	}
}

impl fmt::Display for UnitError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UnitError::Rewrite {
				rule_id,
				match_index,
				message,
			} => write!(f, "rule '{}' failed on match #{}: {}", rule_id, match_index, message),
			UnitError::Read { message } => write!(f, "read failed: {}", message),
			UnitError::Persistence { message } => write!(f, "write failed: {}", message),
		}
	}
}

/// Render an error and its sources as "outer: inner: ...".
fn error_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}

/// What the engine (and runner) did to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
	pub unit_id: String,
	/// One entry per rule that was applied, in rule order.
	pub rules: Vec<RuleHits>,
	pub modified: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<UnitError>,
}

impl UnitRecord {
	pub fn new(unit_id: impl Into<String>) -> Self {
		Self {
			unit_id: unit_id.into(),
			rules: Vec::new(),
			modified: false,
			errors: Vec::new(),
		}
	}

	/// Record for a unit that failed before any rule ran (e.g. unreadable).
	pub fn failed(unit_id: impl Into<String>, error: UnitError) -> Self {
		let mut record = Self::new(unit_id);
		record.errors.push(error);
		record
	}

	/// First error recorded for this unit.
	pub fn error(&self) -> Option<&UnitError> {
		self.errors.first()
	}

	pub fn is_errored(&self) -> bool {
		!self.errors.is_empty()
	}

	pub fn total_matches(&self) -> usize {
		self.rules.iter().map(|hits| hits.match_count).sum()
	}

	pub fn match_count(&self, rule_id: &str) -> Option<usize> {
		self.rules
			.iter()
			.find(|hits| hits.rule_id == rule_id)
			.map(|hits| hits.match_count)
	}

	/// The rewritten content never reached disk: errored, not modified.
	pub fn mark_persistence_failed(&mut self, err: &RekitError) {
		self.modified = false;
		self.errors.push(UnitError::from_error(err));
	}
}

/// Aggregate record of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunRecord {
	units: Vec<UnitRecord>,
	/// Explicitly listed units that did not exist.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	skipped: Vec<String>,
	units_scanned: usize,
	units_modified: usize,
	units_errored: usize,
}

impl RunRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, record: UnitRecord) {
		self.units_scanned += 1;
		if record.modified {
			self.units_modified += 1;
		}
		if record.is_errored() {
			self.units_errored += 1;
		}
		self.units.push(record);
	}

	pub fn push_skipped(&mut self, unit_id: impl Into<String>) {
		self.skipped.push(unit_id.into());
	}

	pub fn units(&self) -> &[UnitRecord] {
		&self.units
	}

	pub fn skipped(&self) -> &[String] {
		&self.skipped
	}

	pub fn units_scanned(&self) -> usize {
		self.units_scanned
	}

	pub fn units_modified(&self) -> usize {
		self.units_modified
	}

	pub fn units_errored(&self) -> usize {
		self.units_errored
	}

	pub fn has_errors(&self) -> bool {
		self.units_errored > 0
	}
}
