use std::path::PathBuf;

/// Library-level structured errors for rekit.
///
/// Configuration variants are fatal to a run and surface before any unit is
/// touched. `Rewrite`, `Read` and `Persistence` are per-unit and end up in the
/// unit's change record instead of aborting the run.
#[derive(Debug, thiserror::Error)]
pub enum RekitError {
	#[error("Config file not found (searched upward from {start})")]
	ConfigNotFound { start: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid regex pattern in rule '{rule_id}': {pattern}")]
	InvalidRegex {
		rule_id: String,
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Invalid substitution in rule '{rule_id}': {input} ({reason})")]
	InvalidSubstitution {
		rule_id: String,
		input: String,
		reason: String,
	},

	#[error("Invalid glob pattern: {pattern}")]
	InvalidGlob {
		pattern: String,
		#[source]
		source: globset::Error,
	},

	#[error("Invalid unit path {path}: {reason}")]
	InvalidUnitPath { path: PathBuf, reason: String },

	#[error("Duplicate rule id: {rule_id}")]
	DuplicateRuleId { rule_id: String },

	#[error("Invalid rule '{rule_id}': {reason}")]
	InvalidRule { rule_id: String, reason: String },

	#[error("Mutually exclusive options in rule '{rule_id}': {option1} and {option2}")]
	MutuallyExclusive {
		rule_id: String,
		option1: String,
		option2: String,
	},

	#[error("Rule '{rule_id}' failed on match #{match_index}: {message}")]
	Rewrite {
		rule_id: String,
		match_index: usize,
		message: String,
	},

	#[error("Failed to read unit: {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to persist unit: {path}")]
	Persistence {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to walk directory: {path}")]
	Walk {
		path: PathBuf,
		#[source]
		source: walkdir::Error,
	},
}

impl RekitError {
	/// Whether this error aborts the whole run rather than a single unit.
	pub fn is_fatal(&self) -> bool {
		!matches!(
			self,
			RekitError::Rewrite { .. } | RekitError::Read { .. } | RekitError::Persistence { .. }
		)
	}
}

/// Result type alias using RekitError.
pub type Result<T> = std::result::Result<T, RekitError>;
