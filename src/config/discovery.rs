use crate::config::parser::parse_config_file;
use crate::config::types::LoadedConfig;
use crate::error::{RekitError, Result};
use std::path::{Path, PathBuf};

/// File name looked up when no explicit config path is given.
pub const CONFIG_FILE_NAME: &str = ".rekit.toml";

/// Find the nearest config file, starting at `start_dir` and walking up the
/// directory tree.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
	let mut current_dir = Some(start_dir);

	while let Some(dir) = current_dir {
		let config_path = dir.join(CONFIG_FILE_NAME);
		if config_path.is_file() {
			return Some(config_path);
		}
		current_dir = dir.parent();
	}

	None
}

/// Load the config for a run.
///
/// An explicit path always wins; otherwise the nearest `.rekit.toml` at or
/// above `start_dir` is used.
pub fn load_config(explicit: Option<&Path>, start_dir: &Path) -> Result<LoadedConfig> {
	let path = match explicit {
		Some(path) => path.to_path_buf(),
		None => find_config(start_dir).ok_or_else(|| RekitError::ConfigNotFound {
			start: start_dir.to_path_buf(),
		})?,
	};

	tracing::debug!(path = %path.display(), "loading config");
	let config = parse_config_file(&path)?;

	Ok(LoadedConfig { config, path })
}
