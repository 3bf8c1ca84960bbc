//! Human and machine readable run reports.

use crate::engine::{RunRecord, RunState, UnitRecord};
use crate::runner::RunOutcome;
use serde::Serialize;
use std::fmt::Write;

/// Render one line per unit followed by the aggregate counts.
///
/// Unchanged units are listed only when `verbose` is set.
pub fn render_text(record: &RunRecord, verbose: bool) -> String {
	let mut out = String::new();

	for unit in record.units() {
		if unit.is_errored() {
			for error in &unit.errors {
				let _ = writeln!(out, "errored    {}: {}", unit.unit_id, error);
			}
		} else if unit.modified {
			let _ = writeln!(out, "modified   {} ({})", unit.unit_id, describe_hits(unit));
		} else if verbose {
			let _ = writeln!(out, "unchanged  {}", unit.unit_id);
		}
	}

	for skipped in record.skipped() {
		let _ = writeln!(out, "skipped    {} (not found)", skipped);
	}

	let _ = writeln!(
		out,
		"{} scanned, {} modified, {} errored, {} skipped",
		record.units_scanned(),
		record.units_modified(),
		record.units_errored(),
		record.skipped().len()
	);

	out
}

fn describe_hits(unit: &UnitRecord) -> String {
	unit.rules
		.iter()
		.filter(|hits| hits.match_count > 0)
		.map(|hits| format!("{}: {}", hits.rule_id, hits.match_count))
		.collect::<Vec<_>>()
		.join(", ")
}

#[derive(Serialize)]
struct JsonReport<'a> {
	summary: &'a RunRecord,
	state: &'a RunState,
}

/// Render the run record and final state as pretty-printed JSON.
pub fn render_json(outcome: &RunOutcome) -> serde_json::Result<String> {
	serde_json::to_string_pretty(&JsonReport {
		summary: &outcome.record,
		state: &outcome.state,
	})
}
