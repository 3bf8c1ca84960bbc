//! Backups taken before units are overwritten in place.
//!
//! Each run gets its own timestamped session directory mirroring the relative
//! layout of the units, so a bad run can be undone by copying it back.

use crate::error::{RekitError, Result};
use crate::runner::units::Unit;
use std::fs;
use std::path::{Path, PathBuf};

/// One run's backup directory.
#[derive(Debug)]
pub struct BackupSession {
	session_dir: PathBuf,
}

impl BackupSession {
	/// Create a new timestamped session directory under `backup_dir`.
	pub fn start(backup_dir: &Path) -> Result<Self> {
		let timestamp = chrono::Local::now()
			.format("%Y-%m-%dT%H-%M-%S%.3f")
			.to_string();
		let session_dir = backup_dir.join(timestamp);

		fs::create_dir_all(&session_dir).map_err(|source| RekitError::Persistence {
			path: session_dir.clone(),
			source,
		})?;

		tracing::debug!(dir = %session_dir.display(), "backup session started");
		Ok(Self { session_dir })
	}

	/// Copy a unit into the session before it is modified.
	pub fn backup(&self, unit: &Unit) -> Result<PathBuf> {
		let backup_path = unit.mirrored_in(&self.session_dir)?;

		if let Some(parent) = backup_path.parent() {
			fs::create_dir_all(parent).map_err(|source| RekitError::Persistence {
				path: parent.to_path_buf(),
				source,
			})?;
		}

		fs::copy(&unit.path, &backup_path).map_err(|source| RekitError::Persistence {
			path: backup_path.clone(),
			source,
		})?;

		Ok(backup_path)
	}

	pub fn session_dir(&self) -> &Path {
		&self.session_dir
	}
}
