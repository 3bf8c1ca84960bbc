//! Configuration loading and parsing for rekit.
//!
//! This module handles:
//! - TOML config file parsing and validation
//! - Config discovery (nearest `.rekit.toml` upward from the working directory)
//! - The `rekit init` template

pub mod discovery;
pub mod parser;
pub mod template;
pub mod types;

pub use discovery::{CONFIG_FILE_NAME, find_config, load_config};
pub use parser::{parse_config_file, parse_config_str};
pub use template::generate_init_template;
pub use types::{BackupConfig, Config, CounterConfig, LoadedConfig, RuleConfig, UnitsConfig};
