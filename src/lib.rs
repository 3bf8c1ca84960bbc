//! Rekit - pattern-driven, stateful batch text rewriting.
//!
//! This library provides the core functionality for rekit, including:
//! - Configuration file parsing and discovery
//! - Rules: a regex matcher plus a template, sed-like or stateful replacer
//! - The rewrite engine, with run-wide state and per-unit rollback
//! - The batch runner that enumerates files, persists results and takes backups
//!
//! # Example
//!
//! ```
//! use rekit_cli::engine::{RewriteEngine, RunState};
//! use rekit_cli::rules::{Counter, Rule, RuleSet};
//!
//! let rules = RuleSet::new(vec![
//! 	Rule::template("js", r#"src="js/([^"]+)""#, r#"src="/admin/js/$1""#).unwrap(),
//! 	Rule::stateful("ids", r"\(@user_id,", Counter::new(2, "(@user_id, {n},")).unwrap(),
//! ])
//! .unwrap();
//!
//! let engine = RewriteEngine::default();
//! let mut state = RunState::for_rules(&rules);
//!
//! let first = engine.apply("a.sql", "(@user_id, 'x')", &rules, &mut state);
//! let second = engine.apply("b.sql", "(@user_id, 'y')", &rules, &mut state);
//!
//! assert_eq!(first.content, "(@user_id, 2, 'x')");
//! assert_eq!(second.content, "(@user_id, 3, 'y')");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod rules;
pub mod runner;

pub use error::{RekitError, Result};
