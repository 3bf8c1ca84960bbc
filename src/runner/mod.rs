//! Batch runner for rekit.
//!
//! This module handles:
//! - Enumerating units (files) from the `[units]` config
//! - Reading each unit, running the engine, persisting changes
//! - Backups before in-place writes
//! - Aggregating unit records into a run record

pub mod backup;
pub mod units;

pub use backup::BackupSession;
pub use units::{Enumerated, Unit, UnitSource};

use crate::engine::{FailurePolicy, RewriteEngine, Rewritten, RunRecord, RunState, UnitError, UnitRecord};
use crate::error::{RekitError, Result};
use crate::rules::RuleSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where rewritten units go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PersistMode {
	/// Overwrite each unit in place.
	#[default]
	InPlace,

	/// Write rewritten units under this directory, mirroring their relative
	/// paths; sources are left untouched.
	OutputDir(PathBuf),

	/// Report only; write nothing.
	DryRun,
}

/// Options for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
	pub policy: FailurePolicy,
	pub persist: PersistMode,
	/// Back up units before overwriting them in place.
	pub backup_dir: Option<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutcome {
	pub record: RunRecord,

	/// Rule-local state as left by the last unit.
	pub state: RunState,

	/// Backup session directory, if backups were taken.
	pub backup_session: Option<PathBuf>,
}

/// Drives one run: the only caller of the engine.
#[derive(Debug)]
pub struct BatchRunner<'a> {
	rules: &'a RuleSet,
	engine: RewriteEngine,
	options: RunOptions,
}

impl<'a> BatchRunner<'a> {
	pub fn new(rules: &'a RuleSet, options: RunOptions) -> Self {
		Self {
			rules,
			engine: RewriteEngine::new(options.policy),
			options,
		}
	}

	/// Enumerate `source` and rewrite every unit with one shared `RunState`.
	pub fn run(&self, source: &UnitSource) -> Result<RunOutcome> {
		let backup = match (&self.options.backup_dir, &self.options.persist) {
			(Some(dir), PersistMode::InPlace) => Some(BackupSession::start(dir)?),
			_ => None,
		};

		let mut skip_dirs: Vec<&Path> = Vec::new();
		if let Some(ref dir) = self.options.backup_dir {
			skip_dirs.push(dir);
		}
		if let PersistMode::OutputDir(ref dir) = self.options.persist {
			skip_dirs.push(dir);
		}

		let enumerated = source.enumerate_excluding(&skip_dirs)?;
		tracing::info!(
			units = enumerated.units.len(),
			rules = self.rules.len(),
			policy = %self.options.policy,
			"starting run"
		);

		let mut record = RunRecord::new();
		for missing in enumerated.missing {
			record.push_skipped(missing);
		}

		let mut state = RunState::for_rules(self.rules);
		for unit in &enumerated.units {
			record.push(self.process(unit, &mut state, backup.as_ref()));
		}

		tracing::info!(
			scanned = record.units_scanned(),
			modified = record.units_modified(),
			errored = record.units_errored(),
			"run finished"
		);

		Ok(RunOutcome {
			record,
			state,
			backup_session: backup.map(|session| session.session_dir().to_path_buf()),
		})
	}

	fn process(&self, unit: &Unit, state: &mut RunState, backup: Option<&BackupSession>) -> UnitRecord {
		let content = match fs::read_to_string(&unit.path) {
			Ok(content) => content,
			Err(source) => {
				let err = RekitError::Read {
					path: unit.path.clone(),
					source,
				};
				tracing::warn!(unit = %unit.id, "{}", err);
				return UnitRecord::failed(&unit.id, UnitError::from_error(&err));
			}
		};

		let before = state.clone();
		let Rewritten {
			content: rewritten,
			mut record,
		} = self.engine.apply(&unit.id, &content, self.rules, state);

		if !record.modified {
			tracing::debug!(unit = %unit.id, "unchanged");
			return record;
		}

		match self.persist(unit, &rewritten, backup) {
			Ok(()) => {
				tracing::info!(unit = %unit.id, matches = record.total_matches(), "rewritten");
			}
			Err(err) => {
				tracing::warn!(unit = %unit.id, "{}", err);
				// writes go through a temp file, so the unit on disk is still the
				// original and the values it consumed are handed back
				*state = before;
				record.mark_persistence_failed(&err);
			}
		}

		record
	}

	fn persist(&self, unit: &Unit, content: &str, backup: Option<&BackupSession>) -> Result<()> {
		match self.options.persist {
			PersistMode::DryRun => Ok(()),
			PersistMode::InPlace => {
				if let Some(session) = backup {
					session.backup(unit)?;
				}
				write_unit(&unit.path, content)
			}
			PersistMode::OutputDir(ref dir) => {
				let target = unit.mirrored_in(dir)?;
				if let Some(parent) = target.parent() {
					fs::create_dir_all(parent).map_err(|source| RekitError::Persistence {
						path: parent.to_path_buf(),
						source,
					})?;
				}
				write_unit(&target, content)
			}
		}
	}
}

/// Write `content` to a temp file next to `path` and rename it into place, so
/// a failed write never leaves a truncated unit behind.
fn write_unit(path: &Path, content: &str) -> Result<()> {
	let persistence = |source: std::io::Error| RekitError::Persistence {
		path: path.to_path_buf(),
		source,
	};

	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let mut file = tempfile::NamedTempFile::new_in(dir).map_err(persistence)?;
	file.write_all(content.as_bytes()).map_err(persistence)?;

	if let Ok(metadata) = fs::metadata(path) {
		fs::set_permissions(file.path(), metadata.permissions()).map_err(persistence)?;
	}

	file.persist(path).map_err(|err| persistence(err.error))?;
	Ok(())
}
