/// Generate the commented `.rekit.toml` written by `rekit init`.
pub fn generate_init_template() -> String {
	r#"# rekit configuration
#
# Rules run top to bottom; each rule sees the output of the rules above it.

# What to do when a replacer fails on a file:
#   "rollback-unit" leaves the file untouched and rewinds counters (default)
#   "skip-rule"     keeps earlier rules' edits and skips only the failing rule
on-error = "rollback-unit"

[units]
# Directory to scan, relative to this file.
base = "."
include = ["**/*.php"]
exclude = ["vendor/**"]
# Explicit files (relative to base); missing ones are reported and skipped.
# files = ["includes/mailer.php"]

# [backup]
# dir = ".rekit-backups"

# Fixed template with capture groups.
[[rules]]
id = "admin-js-path"
pattern = '<script\s+src="js/([^"]+)"'
template = '<script src="<?= PUBLIC_PATH ?>/php/admin/js/$1"'

# Sed-like substitution; add `g` to rewrite every match.
# [[rules]]
# id = "closing-tag"
# sub = 's/\?>\s*$/\n/'

# Counter: `{n}` is replaced by a value that keeps increasing across every file.
# [[rules]]
# id = "backfill-ids"
# pattern = '\) VALUES \(\s*@user_id,'
# counter = { start = 2, template = "$0\n    {n}," }
"#
	.to_string()
}
