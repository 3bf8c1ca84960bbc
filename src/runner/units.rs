use crate::config::CONFIG_FILE_NAME;
use crate::config::types::UnitsConfig;
use crate::error::{RekitError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One file to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
	/// Identifier used in reports: the relative path with `/` separators.
	pub id: String,

	/// Path on disk.
	pub path: PathBuf,

	/// Path relative to the source base; mirrored under output and backup dirs.
	pub relative: PathBuf,
}

impl Unit {
	fn new(base: &Path, path: PathBuf) -> Self {
		let relative: PathBuf = path
			.strip_prefix(base)
			.unwrap_or(path.as_path())
			.components()
			.filter(|c| matches!(c, Component::Normal(_)))
			.collect();
		let id = relative.to_string_lossy().replace('\\', "/");
		Self { id, path, relative }
	}

	/// Where this unit lands when mirrored under `dir` (output or backup).
	///
	/// Fails if the relative path would leave `dir`.
	pub fn mirrored_in(&self, dir: &Path) -> Result<PathBuf> {
		let target = dir.join(&self.relative);
		let contained = !self.relative.as_os_str().is_empty()
			&& self
				.relative
				.components()
				.all(|c| matches!(c, Component::Normal(_)))
			&& target.starts_with(dir);
		if !contained {
			return Err(RekitError::Persistence {
				path: target,
				source: std::io::Error::new(
					std::io::ErrorKind::InvalidInput,
					format!("unit '{}' would be written outside {}", self.id, dir.display()),
				),
			});
		}
		Ok(target)
	}
}

/// Result of enumerating a source.
#[derive(Debug, Default)]
pub struct Enumerated {
	/// Units in path order.
	pub units: Vec<Unit>,

	/// Explicitly listed files that do not exist.
	pub missing: Vec<String>,
}

/// Selects the files that make up a run.
#[derive(Debug)]
pub struct UnitSource {
	base: PathBuf,
	include: Option<GlobSet>,
	exclude: GlobSet,
	files: Vec<PathBuf>,
	recursive: bool,
	/// Canonical paths that are never units, whatever the globs say.
	excluded_files: Vec<PathBuf>,
}

impl UnitSource {
	/// Every file under `base`, recursively.
	pub fn new(base: impl Into<PathBuf>) -> Self {
		Self {
			base: base.into(),
			include: None,
			exclude: GlobSet::empty(),
			files: Vec::new(),
			recursive: true,
			excluded_files: Vec::new(),
		}
	}

	/// Build a source from the `[units]` table; relative paths resolve against `config_dir`.
	pub fn from_config(config: &UnitsConfig, config_dir: &Path) -> Result<Self> {
		let base = match config.base {
			Some(ref base) => config_dir.join(base),
			None => config_dir.to_path_buf(),
		};

		// Explicit files alone mean "just these files".
		let include = if config.include.is_empty() {
			if config.files.is_empty() {
				None
			} else {
				Some(GlobSet::empty())
			}
		} else {
			Some(build_globset(&config.include)?)
		};

		for file in &config.files {
			check_listed_file(file)?;
		}

		// Discoverable config files are never units; an explicitly named one
		// is kept out with `exclude_file`.
		let mut exclude = config.exclude.clone();
		exclude.push(CONFIG_FILE_NAME.to_string());

		Ok(Self {
			base,
			include,
			exclude: build_globset(&exclude)?,
			files: config.files.clone(),
			recursive: config.recursive,
			excluded_files: Vec::new(),
		})
	}

	/// Never treat `path` as a unit, e.g. the config file driving the run.
	pub fn exclude_file(mut self, path: &Path) -> Self {
		if let Ok(canonical) = path.canonicalize() {
			self.excluded_files.push(canonical);
		}
		self
	}

	pub fn base(&self) -> &Path {
		&self.base
	}

	pub fn enumerate(&self) -> Result<Enumerated> {
		self.enumerate_excluding(&[])
	}

	/// Enumerate units, never descending into any of `skip_dirs`.
	///
	/// Used to keep backup and output directories out of the scan when they
	/// live under the base.
	pub fn enumerate_excluding(&self, skip_dirs: &[&Path]) -> Result<Enumerated> {
		let skip: Vec<PathBuf> = skip_dirs
			.iter()
			.filter_map(|dir| dir.canonicalize().ok())
			.collect();

		let mut found = BTreeMap::new();

		if self.should_walk() {
			let max_depth = if self.recursive { usize::MAX } else { 1 };
			let walker = WalkDir::new(&self.base)
				.follow_links(false)
				.max_depth(max_depth)
				.into_iter()
				.filter_entry(|entry| !is_skipped_dir(entry, &skip));

			for entry in walker {
				let entry = entry.map_err(|source| RekitError::Walk {
					path: self.base.clone(),
					source,
				})?;
				if !entry.file_type().is_file() {
					continue;
				}
				let unit = Unit::new(&self.base, entry.into_path());
				if self.is_included(&unit.relative)
					&& !self.is_excluded(&unit.relative)
					&& !self.is_excluded_file(&unit.path)
				{
					found.insert(unit.relative.clone(), unit);
				}
			}
		}

		let mut missing = Vec::new();
		for file in &self.files {
			let path = self.base.join(file);
			if path.is_file() {
				if self.is_excluded_file(&path) {
					continue;
				}
				let unit = Unit::new(&self.base, path);
				found.insert(unit.relative.clone(), unit);
			} else {
				tracing::info!(file = %file.display(), "listed file not found, skipping");
				missing.push(file.to_string_lossy().replace('\\', "/"));
			}
		}

		Ok(Enumerated {
			units: found.into_values().collect(),
			missing,
		})
	}

	fn should_walk(&self) -> bool {
		match self.include {
			Some(ref include) => !include.is_empty(),
			None => true,
		}
	}

	fn is_included(&self, relative: &Path) -> bool {
		match self.include {
			Some(ref include) => include.is_match(relative),
			None => true,
		}
	}

	fn is_excluded_file(&self, path: &Path) -> bool {
		!self.excluded_files.is_empty()
			&& path
				.canonicalize()
				.is_ok_and(|canonical| self.excluded_files.contains(&canonical))
	}

	fn is_excluded(&self, relative: &Path) -> bool {
		self.exclude.is_match(relative)
			|| relative
				.file_name()
				.is_some_and(|name| self.exclude.is_match(name))
	}
}

fn is_skipped_dir(entry: &walkdir::DirEntry, skip: &[PathBuf]) -> bool {
	if entry.depth() == 0 || !entry.file_type().is_dir() {
		return false;
	}
	if entry.file_name() == ".git" {
		return true;
	}
	!skip.is_empty()
		&& entry
			.path()
			.canonicalize()
			.is_ok_and(|canonical| skip.contains(&canonical))
}

/// Listed files must stay under the base so their mirrored output and backup
/// paths stay under the output and backup directories.
fn check_listed_file(file: &Path) -> Result<()> {
	let invalid = |reason: &str| RekitError::InvalidUnitPath {
		path: file.to_path_buf(),
		reason: reason.to_string(),
	};
	for component in file.components() {
		match component {
			Component::Normal(_) | Component::CurDir => {}
			Component::ParentDir => return Err(invalid("'..' would leave the base directory")),
			Component::RootDir | Component::Prefix(_) => {
				return Err(invalid("listed files must be relative to the base directory"));
			}
		}
	}
	if file.file_name().is_none() {
		return Err(invalid("not a file path"));
	}
	Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|source| RekitError::InvalidGlob {
			pattern: pattern.clone(),
			source,
		})?;
		builder.add(glob);
	}
	builder.build().map_err(|source| RekitError::InvalidGlob {
		pattern: patterns.join(", "),
		source,
	})
}
