//! The rewrite engine.
//!
//! This module handles:
//! - Applying a rule set to one content buffer, rule by rule
//! - Threading stateful replacers' state through a caller-owned `RunState`
//! - Per-unit rollback according to the failure policy
//! - Per-unit and per-run change records

pub mod record;
pub mod rewrite;
pub mod state;

pub use record::{RuleHits, RunRecord, UnitError, UnitRecord};
pub use rewrite::{FailurePolicy, RewriteEngine, Rewritten};
pub use state::RunState;
