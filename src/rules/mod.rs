//! Rewrite rules for rekit.
//!
//! This module handles:
//! - Compiling rules (matcher + replacer) and validating rule sets
//! - Sed-like `s/pattern/replacement/flags` substitutions
//! - Stateful replacers, including the run-wide counter

pub mod counter;
pub mod replacer;
pub mod rule;
pub mod substitution;

pub use counter::{COUNTER_PLACEHOLDER, Counter};
pub use replacer::{FnReplacer, Replacer, RuleState, StatefulReplacer};
pub use rule::{Rule, RuleSet, compile_rules};
pub use substitution::Substitution;
