#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn rekit_cmd() -> assert_cmd::Command {
	assert_cmd::Command::cargo_bin("rekit").unwrap()
}

fn write_config(dir: &Path, content: &str) {
	fs::write(dir.join(".rekit.toml"), content).unwrap();
}

const ADMIN_CONFIG: &str = r##"
[units]
base = "admin"
include = ["*.php"]
exclude = ["admin_sidebar.php"]
recursive = false

[[rules]]
id = "admin-js"
pattern = '<script\s+src="js/([^"]+)"'
template = '<script src="<?= PUBLIC_PATH ?>/php/admin/js/$1"'

[[rules]]
id = "favicon"
sub = 's#href="\.\./images/#href="<?= IMAGES_PATH ?>/#g'
"##;

fn admin_fixture() -> tempfile::TempDir {
	let temp_dir = tempfile::tempdir().unwrap();
	let admin = temp_dir.path().join("admin");
	fs::create_dir_all(&admin).unwrap();

	write_config(temp_dir.path(), ADMIN_CONFIG);
	fs::write(
		admin.join("users.php"),
		"<link href=\"../images/favicon.png\">\n<script src=\"js/users.js\"></script>\n",
	)
	.unwrap();
	fs::write(admin.join("admin_sidebar.php"), "<script src=\"js/sidebar.js\"></script>\n").unwrap();
	fs::write(admin.join("plain.php"), "<?php echo 'hi';\n").unwrap();
	temp_dir
}

const SEED_CONFIG: &str = r#"
[units]
include = ["*.sql"]

[[rules]]
id = "backfill-ids"
pattern = '\) VALUES \(\s*@user_id,'
counter = { start = 2, template = "$0 {n}," }
"#;

fn seed_fixture() -> tempfile::TempDir {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), SEED_CONFIG);
	fs::write(
		temp_dir.path().join("a.sql"),
		"INSERT INTO t (u, id, v) VALUES (@user_id, 'x');\nINSERT INTO t (u, id, v) VALUES (@user_id, 'y');\n",
	)
	.unwrap();
	fs::write(
		temp_dir.path().join("b.sql"),
		"INSERT INTO t (u, id, v) VALUES (@user_id, 'z');\n",
	)
	.unwrap();
	temp_dir
}

// ============================================================================
// CLI flag tests
// ============================================================================

#[test]
fn test_help_flag() {
	rekit_cmd()
		.arg("--help")
		.assert()
		.success()
		.stdout(predicate::str::contains("stateful batch text rewriting"));
}

#[test]
fn test_version_flag() {
	rekit_cmd()
		.arg("--version")
		.assert()
		.success()
		.stdout(predicate::str::contains("rekit"));
}

#[test]
fn test_no_args_shows_help() {
	rekit_cmd()
		.assert()
		.failure()
		.stderr(predicate::str::contains("Usage"));
}

// ============================================================================
// init tests
// ============================================================================

#[test]
fn test_init_creates_config() {
	let temp_dir = tempfile::tempdir().unwrap();
	let config_path = temp_dir.path().join(".rekit.toml");

	rekit_cmd()
		.arg("init")
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Created .rekit.toml"));

	let content = fs::read_to_string(&config_path).unwrap();
	assert!(content.contains("on-error"));
	assert!(content.contains("[[rules]]"));
}

#[test]
fn test_init_fails_if_exists() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), "# existing");

	rekit_cmd()
		.arg("init")
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_force_overwrites() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), "# existing");

	rekit_cmd()
		.args(["init", "--force"])
		.current_dir(temp_dir.path())
		.assert()
		.success();

	let content = fs::read_to_string(temp_dir.path().join(".rekit.toml")).unwrap();
	assert!(content.contains("[[rules]]"));
}

// ============================================================================
// config subcommand tests
// ============================================================================

#[test]
fn test_config_validate_valid_config() {
	let temp_dir = admin_fixture();

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("valid"))
		.stdout(predicate::str::contains("2 rules"));
}

#[test]
fn test_config_validate_invalid_toml() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), "invalid toml [[[");

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_config_validate_invalid_regex() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[[rules]]
id = "broken"
pattern = "(unclosed"
template = "x"
"#,
	);

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("broken"));
}

#[test]
fn test_config_validate_duplicate_ids() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[[rules]]
id = "same"
pattern = "a"
template = "b"

[[rules]]
id = "same"
pattern = "c"
template = "d"
"#,
	);

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("Duplicate rule id: same"));
}

#[test]
fn test_config_show_displays_config() {
	let temp_dir = admin_fixture();

	rekit_cmd()
		.args(["config", "show"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("on-error: rollback-unit"))
		.stdout(predicate::str::contains("admin-js"))
		.stdout(predicate::str::contains("sub: s#href="));
}

#[test]
fn test_explicit_config_path() {
	let temp_dir = admin_fixture();
	let elsewhere = tempfile::tempdir().unwrap();

	rekit_cmd()
		.args(["config", "validate", "--config"])
		.arg(temp_dir.path().join(".rekit.toml"))
		.current_dir(elsewhere.path())
		.assert()
		.success();
}

#[test]
fn test_config_found_from_subdirectory() {
	let temp_dir = admin_fixture();

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path().join("admin"))
		.assert()
		.success();
}

// ============================================================================
// run tests
// ============================================================================

#[test]
fn test_run_rewrites_in_place() {
	let temp_dir = admin_fixture();
	let admin = temp_dir.path().join("admin");

	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("modified   users.php (admin-js: 1, favicon: 1)"))
		.stdout(predicate::str::contains("2 scanned, 1 modified, 0 errored"));

	assert_eq!(
		fs::read_to_string(admin.join("users.php")).unwrap(),
		"<link href=\"<?= IMAGES_PATH ?>/favicon.png\">\n<script src=\"<?= PUBLIC_PATH ?>/php/admin/js/users.js\"></script>\n"
	);
	// excluded file untouched
	assert_eq!(
		fs::read_to_string(admin.join("admin_sidebar.php")).unwrap(),
		"<script src=\"js/sidebar.js\"></script>\n"
	);
	assert_eq!(
		fs::read_to_string(admin.join("plain.php")).unwrap(),
		"<?php echo 'hi';\n"
	);
}

#[test]
fn test_run_twice_is_idempotent() {
	let temp_dir = admin_fixture();
	let users = temp_dir.path().join("admin/users.php");

	rekit_cmd().arg("run").current_dir(temp_dir.path()).assert().success();
	let first = fs::read_to_string(&users).unwrap();

	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("0 modified"));
	assert_eq!(fs::read_to_string(&users).unwrap(), first);
}

#[test]
fn test_counter_continues_across_files() {
	let temp_dir = seed_fixture();

	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.success();

	assert_eq!(
		fs::read_to_string(temp_dir.path().join("a.sql")).unwrap(),
		"INSERT INTO t (u, id, v) VALUES (@user_id, 2, 'x');\nINSERT INTO t (u, id, v) VALUES (@user_id, 3, 'y');\n"
	);
	assert_eq!(
		fs::read_to_string(temp_dir.path().join("b.sql")).unwrap(),
		"INSERT INTO t (u, id, v) VALUES (@user_id, 4, 'z');\n"
	);
}

#[test]
fn test_dry_run_writes_nothing() {
	let temp_dir = admin_fixture();
	let users = temp_dir.path().join("admin/users.php");
	let before = fs::read_to_string(&users).unwrap();

	rekit_cmd()
		.args(["run", "--dry-run"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("modified   users.php"));

	assert_eq!(fs::read_to_string(&users).unwrap(), before);
}

#[test]
fn test_output_dir() {
	let temp_dir = seed_fixture();
	let out = temp_dir.path().join("out");

	rekit_cmd()
		.args(["run", "--output-dir"])
		.arg(&out)
		.current_dir(temp_dir.path())
		.assert()
		.success();

	assert!(
		fs::read_to_string(temp_dir.path().join("a.sql"))
			.unwrap()
			.contains("(@user_id, 'x')")
	);
	assert!(
		fs::read_to_string(out.join("b.sql"))
			.unwrap()
			.contains("(@user_id, 4, 'z')")
	);
}

#[test]
fn test_dry_run_conflicts_with_output_dir() {
	let temp_dir = seed_fixture();

	rekit_cmd()
		.args(["run", "--dry-run", "--output-dir", "out"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_backup_dir_keeps_originals() {
	let temp_dir = seed_fixture();
	let backups = temp_dir.path().join("backups");

	rekit_cmd()
		.args(["run", "--backup-dir"])
		.arg(&backups)
		.current_dir(temp_dir.path())
		.assert()
		.success();

	let sessions: Vec<_> = fs::read_dir(&backups).unwrap().collect();
	assert_eq!(sessions.len(), 1);
	let session = sessions[0].as_ref().unwrap().path();
	assert!(
		fs::read_to_string(session.join("b.sql"))
			.unwrap()
			.contains("(@user_id, 'z')")
	);
}

#[test]
fn test_json_report() {
	let temp_dir = seed_fixture();

	let output = rekit_cmd()
		.args(["run", "--format", "json", "--dry-run"])
		.current_dir(temp_dir.path())
		.output()
		.unwrap();
	assert!(output.status.success());

	let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
	assert_eq!(json["summary"]["units_scanned"], 2);
	assert_eq!(json["summary"]["units_modified"], 2);
	assert_eq!(json["summary"]["units"][0]["unit_id"], "a.sql");
	assert_eq!(json["summary"]["units"][0]["rules"][0]["match_count"], 2);
	assert_eq!(json["state"]["backfill-ids"], 5);
}

#[test]
fn test_errored_unit_fails_run() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[units]
include = ["*.sql"]

[[rules]]
id = "ids"
pattern = 'VALUES \('
counter = { start = 9223372036854775807, template = "$0{n}, " }
"#,
	);
	let seed = temp_dir.path().join("seed.sql");
	fs::write(&seed, "VALUES ('x'); VALUES ('y');").unwrap();

	// the first match still gets i64::MAX; the second has no value left
	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stdout(predicate::str::contains("errored    seed.sql: rule 'ids' failed on match #2"));

	// rolled back: nothing written
	assert_eq!(fs::read_to_string(&seed).unwrap(), "VALUES ('x'); VALUES ('y');");

	rekit_cmd()
		.args(["run", "--allow-errors"])
		.current_dir(temp_dir.path())
		.assert()
		.success();
}

#[test]
fn test_missing_listed_file_is_skipped() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[units]
files = ["includes/mailer.php", "includes/rate_limiter.php"]

[[rules]]
id = "closing-tag"
sub = 's/\?>\s*$//'
"#,
	);
	fs::create_dir_all(temp_dir.path().join("includes")).unwrap();
	fs::write(temp_dir.path().join("includes/mailer.php"), "<?php\nsend();\n?>\n").unwrap();

	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("skipped    includes/rate_limiter.php (not found)"))
		.stdout(predicate::str::contains("1 scanned, 1 modified, 0 errored, 1 skipped"));

	assert_eq!(
		fs::read_to_string(temp_dir.path().join("includes/mailer.php")).unwrap(),
		"<?php\nsend();\n"
	);
}

#[test]
fn test_run_without_config_fails() {
	let temp_dir = tempfile::tempdir().unwrap();

	rekit_cmd()
		.args(["run", "--config"])
		.arg(temp_dir.path().join("missing.toml"))
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_counter_can_emit_i64_max() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[units]
include = ["*.sql"]

[[rules]]
id = "ids"
pattern = 'VALUES \('
counter = { start = 9223372036854775807, template = "$0{n}, " }
"#,
	);
	let seed = temp_dir.path().join("seed.sql");
	fs::write(&seed, "VALUES ('x');").unwrap();

	rekit_cmd()
		.arg("run")
		.current_dir(temp_dir.path())
		.assert()
		.success();

	assert_eq!(
		fs::read_to_string(&seed).unwrap(),
		"VALUES (9223372036854775807, 'x');"
	);
}

#[test]
fn test_explicit_config_file_is_not_rewritten() {
	let temp_dir = tempfile::tempdir().unwrap();
	let config = r#"
[[rules]]
id = "js"
pattern = 'src="js/'
template = 'src="X/js/'
"#;
	fs::write(temp_dir.path().join("rules.toml"), config).unwrap();
	fs::write(temp_dir.path().join("a.php"), "<script src=\"js/app.js\">").unwrap();

	rekit_cmd()
		.args(["run", "--config", "rules.toml"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("1 scanned, 1 modified"))
		.stdout(predicate::str::contains("rules.toml").not());

	assert_eq!(
		fs::read_to_string(temp_dir.path().join("rules.toml")).unwrap(),
		config
	);
	assert_eq!(
		fs::read_to_string(temp_dir.path().join("a.php")).unwrap(),
		"<script src=\"X/js/app.js\">"
	);
}

#[test]
fn test_listed_file_outside_base_is_a_config_error() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(
		temp_dir.path(),
		r#"
[units]
base = "seeds"
files = ["../other/a.sql"]

[[rules]]
id = "ids"
pattern = 'VALUES \('
counter = { start = 2, template = "$0{n}, " }
"#,
	);
	fs::create_dir_all(temp_dir.path().join("seeds")).unwrap();
	fs::create_dir_all(temp_dir.path().join("other")).unwrap();
	let source = temp_dir.path().join("other/a.sql");
	fs::write(&source, "VALUES (x);").unwrap();

	rekit_cmd()
		.args(["run", "--output-dir", "out"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("../other/a.sql"));

	assert_eq!(fs::read_to_string(&source).unwrap(), "VALUES (x);");
	assert!(!temp_dir.path().join("out").exists());

	rekit_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.failure();
}

const SKIP_RULE_CONFIG: &str = r#"
on-error = "skip-rule"

[units]
include = ["*.sql"]

[[rules]]
id = "table"
pattern = 'INTO t '
template = 'INTO users '

[[rules]]
id = "ids"
pattern = 'VALUES \('
counter = { start = 9223372036854775807, template = "$0{n}, " }
"#;

#[test]
fn test_skip_rule_keeps_earlier_rules() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), SKIP_RULE_CONFIG);
	let seed = temp_dir.path().join("seed.sql");
	fs::write(&seed, "INSERT INTO t VALUES ('x'); INSERT INTO t VALUES ('y');").unwrap();

	rekit_cmd()
		.args(["run", "--allow-errors"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("errored    seed.sql: rule 'ids' failed on match #2"));

	assert_eq!(
		fs::read_to_string(&seed).unwrap(),
		"INSERT INTO users VALUES ('x'); INSERT INTO users VALUES ('y');"
	);
}

#[test]
fn test_on_error_flag_overrides_config() {
	let temp_dir = tempfile::tempdir().unwrap();
	write_config(temp_dir.path(), SKIP_RULE_CONFIG);
	let seed = temp_dir.path().join("seed.sql");
	let original = "INSERT INTO t VALUES ('x'); INSERT INTO t VALUES ('y');";
	fs::write(&seed, original).unwrap();

	rekit_cmd()
		.args(["run", "--on-error", "rollback-unit"])
		.current_dir(temp_dir.path())
		.assert()
		.failure();

	assert_eq!(fs::read_to_string(&seed).unwrap(), original);
}

#[test]
fn test_backup_dir_flag_overrides_config_table() {
	let temp_dir = seed_fixture();
	let mut config = SEED_CONFIG.to_string();
	config.push_str("\n[backup]\ndir = \"cfg-backups\"\n");
	write_config(temp_dir.path(), &config);

	rekit_cmd()
		.args(["run", "--backup-dir", "cli-backups"])
		.current_dir(temp_dir.path())
		.assert()
		.success();

	assert!(temp_dir.path().join("cli-backups").is_dir());
	assert!(!temp_dir.path().join("cfg-backups").exists());
}

#[test]
fn test_config_backup_dir_is_relative_to_config() {
	let temp_dir = seed_fixture();
	let mut config = SEED_CONFIG.to_string();
	config.push_str("\n[backup]\ndir = \"cfg-backups\"\n");
	write_config(temp_dir.path(), &config);
	let sub = temp_dir.path().join("sub");
	fs::create_dir_all(&sub).unwrap();

	rekit_cmd()
		.arg("run")
		.current_dir(&sub)
		.assert()
		.success();

	let sessions: Vec<_> = fs::read_dir(temp_dir.path().join("cfg-backups"))
		.unwrap()
		.collect();
	assert_eq!(sessions.len(), 1);
	assert!(!sub.join("cfg-backups").exists());
}
