use crate::engine::FailurePolicy;
use crate::error::RekitError;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration from a `.rekit.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
	/// What to do when a replacer fails on a unit.
	#[serde(default)]
	pub on_error: FailurePolicy,

	/// Which files make up the run.
	#[serde(default)]
	pub units: UnitsConfig,

	/// Back up units before they are overwritten.
	#[serde(default)]
	pub backup: Option<BackupConfig>,

	/// Rewrite rules, applied in order.
	#[serde(default)]
	pub rules: Vec<RuleConfig>,
}

/// Unit enumeration settings. Paths are relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnitsConfig {
	/// Directory to scan. Defaults to the config file's directory.
	#[serde(default)]
	pub base: Option<PathBuf>,

	/// Glob patterns selecting files under `base`.
	#[serde(default)]
	pub include: Vec<String>,

	/// Glob patterns removed from the selection (matched on relative path and file name).
	#[serde(default)]
	pub exclude: Vec<String>,

	/// Explicit files, relative to `base`. Missing ones are reported as skipped.
	#[serde(default)]
	pub files: Vec<PathBuf>,

	/// Descend into subdirectories when scanning.
	#[serde(default = "default_recursive")]
	pub recursive: bool,
}

impl Default for UnitsConfig {
	fn default() -> Self {
		Self {
			base: None,
			include: Vec::new(),
			exclude: Vec::new(),
			files: Vec::new(),
			recursive: default_recursive(),
		}
	}
}

fn default_recursive() -> bool {
	true
}

/// Backup settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
	/// Directory that receives one timestamped session directory per run.
	pub dir: PathBuf,
}

/// A rewrite rule as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleConfig {
	/// Stable identifier used in reports. Must be unique.
	pub id: String,

	/// Regex matched against the unit. Required for `template` and `counter`.
	pub pattern: Option<String>,

	/// Fixed replacement; may reference capture groups (`$1`, `${name}`).
	pub template: Option<String>,

	/// Sed-like substitution: "s/pattern/replacement/" or with flags `g`, `i`.
	/// Carries its own pattern, so `pattern` must not be set.
	pub sub: Option<String>,

	/// Run-wide counter replacement.
	pub counter: Option<CounterConfig>,

	/// Maximum number of matches rewritten per unit.
	pub limit: Option<usize>,
}

/// Counter replacement settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterConfig {
	/// First value emitted.
	#[serde(default = "default_counter_start")]
	pub start: i64,

	/// Replacement template; `{n}` is the current value.
	pub template: String,
}

fn default_counter_start() -> i64 {
	1
}

/// A loaded configuration with its source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: Config,

	/// The path this config was loaded from.
	pub path: PathBuf,
}

impl LoadedConfig {
	/// Directory relative paths in the config are resolved against.
	pub fn base_dir(&self) -> PathBuf {
		match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => PathBuf::from("."),
		}
	}
}

impl RuleConfig {
	/// Validate that exactly one replacement form is set and its requirements hold.
	pub fn validate(&self) -> Result<(), RekitError> {
		if self.id.trim().is_empty() {
			return Err(self.invalid("rule id must not be empty"));
		}

		let forms = [
			("template", self.template.is_some()),
			("sub", self.sub.is_some()),
			("counter", self.counter.is_some()),
		];

		let set_forms: Vec<_> = forms
			.iter()
			.filter(|(_, is_set)| *is_set)
			.map(|(name, _)| *name)
			.collect();

		match set_forms.as_slice() {
			[] => return Err(self.invalid("one of template, sub or counter is required")),
			[_] => {}
			[first, second, ..] => {
				return Err(RekitError::MutuallyExclusive {
					rule_id: self.id.clone(),
					option1: first.to_string(),
					option2: second.to_string(),
				});
			}
		}

		if self.sub.is_some() {
			if self.pattern.is_some() {
				return Err(RekitError::MutuallyExclusive {
					rule_id: self.id.clone(),
					option1: "sub".to_string(),
					option2: "pattern".to_string(),
				});
			}
		} else if self.pattern.is_none() {
			return Err(self.invalid(&format!("'{}' requires a pattern", set_forms[0])));
		}

		if self.limit == Some(0) {
			return Err(self.invalid("limit must be at least 1"));
		}

		Ok(())
	}

	fn invalid(&self, reason: &str) -> RekitError {
		RekitError::InvalidRule {
			rule_id: self.id.clone(),
			reason: reason.to_string(),
		}
	}
}

impl Config {
	/// Validate all rules in this config.
	pub fn validate(&self) -> Result<(), RekitError> {
		for rule in &self.rules {
			rule.validate()?;
		}
		Ok(())
	}
}
