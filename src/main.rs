use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rekit_cli::config::{CONFIG_FILE_NAME, LoadedConfig, generate_init_template, load_config};
use rekit_cli::engine::FailurePolicy;
use rekit_cli::report::{render_json, render_text};
use rekit_cli::rules::compile_rules;
use rekit_cli::runner::{BatchRunner, PersistMode, RunOptions, UnitSource};

#[derive(Parser)]
#[command(name = "rekit")]
#[command(
	author,
	version,
	about = "Pattern-driven, stateful batch text rewriting"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Use this config file instead of searching for .rekit.toml
	#[arg(long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Enable debug logging (RUST_LOG overrides)
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Rewrite every unit selected by the config
	Run(RunArgs),

	/// Create a template .rekit.toml in the current directory
	Init {
		/// Overwrite an existing .rekit.toml
		#[arg(long)]
		force: bool,
	},

	/// Configuration management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(clap::Args)]
struct RunArgs {
	/// Report what would change without writing anything
	#[arg(long, conflicts_with = "output_dir")]
	dry_run: bool,

	/// Write rewritten units under this directory instead of in place
	#[arg(long, value_name = "DIR")]
	output_dir: Option<PathBuf>,

	/// Back up units to this directory before overwriting them
	#[arg(long, value_name = "DIR")]
	backup_dir: Option<PathBuf>,

	/// What to do when a rule fails on a unit (rollback-unit, skip-rule)
	#[arg(long, value_name = "POLICY")]
	on_error: Option<FailurePolicy>,

	/// Report format
	#[arg(long, value_enum, default_value_t = Format::Text)]
	format: Format,

	/// Exit successfully even if some units errored
	#[arg(long)]
	allow_errors: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
	Text,
	Json,
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the effective configuration
	Show,
	/// Parse the config and compile its rules without touching any unit
	Validate,
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let config_path = cli.config.as_deref();
	match cli.command {
		Commands::Run(args) => handle_run(config_path, &args, cli.verbose),
		Commands::Init { force } => handle_init(force),
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(config_path),
			ConfigAction::Validate => handle_config_validate(config_path),
		},
	}
}

fn init_logging(verbose: bool) {
	let default_filter = if verbose {
		"rekit=debug,rekit_cli=debug"
	} else {
		"rekit=info,rekit_cli=info"
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn load(config_path: Option<&Path>) -> Result<LoadedConfig> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	load_config(config_path, &cwd).context("Failed to load configuration")
}

fn handle_run(config_path: Option<&Path>, args: &RunArgs, verbose: bool) -> Result<ExitCode> {
	let loaded = load(config_path)?;
	let config_dir = loaded.base_dir();

	let rules = compile_rules(&loaded.config).context("Failed to compile rules")?;
	let source = UnitSource::from_config(&loaded.config.units, &config_dir)
		.context("Invalid [units] configuration")?
		.exclude_file(&loaded.path);

	let persist = if args.dry_run {
		PersistMode::DryRun
	} else if let Some(ref dir) = args.output_dir {
		PersistMode::OutputDir(dir.clone())
	} else {
		PersistMode::InPlace
	};

	// CLI paths are relative to the working directory, config paths to the config file.
	let backup_dir = match (&args.backup_dir, &loaded.config.backup) {
		(Some(dir), _) => Some(dir.clone()),
		(None, Some(backup)) => Some(config_dir.join(&backup.dir)),
		(None, None) => None,
	};

	let options = RunOptions {
		policy: args.on_error.unwrap_or(loaded.config.on_error),
		persist,
		backup_dir,
	};

	let outcome = BatchRunner::new(&rules, options)
		.run(&source)
		.with_context(|| format!("Run aborted (config: {})", loaded.path.display()))?;

	match args.format {
		Format::Text => print!("{}", render_text(&outcome.record, verbose)),
		Format::Json => println!(
			"{}",
			render_json(&outcome).context("Failed to serialize report")?
		),
	}

	if let Some(ref session) = outcome.backup_session {
		tracing::info!(dir = %session.display(), "backups written");
	}

	if outcome.record.has_errors() && !args.allow_errors {
		return Ok(ExitCode::FAILURE);
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let config_path = PathBuf::from(CONFIG_FILE_NAME);

	if config_path.exists() && !force {
		anyhow::bail!("{} already exists. Use --force to overwrite.", CONFIG_FILE_NAME);
	}

	let template = generate_init_template();
	std::fs::write(&config_path, template)
		.with_context(|| format!("Failed to write {}", config_path.display()))?;

	println!("Created {}", CONFIG_FILE_NAME);
	Ok(ExitCode::SUCCESS)
}

fn handle_config_show(config_path: Option<&Path>) -> Result<ExitCode> {
	let loaded = load(config_path)?;
	let config = &loaded.config;
	let units = &config.units;

	println!("# Source: {}", loaded.path.display());
	println!("# on-error: {}", config.on_error);
	println!();

	println!("[units]");
	println!(
		"  base: {}",
		loaded
			.base_dir()
			.join(units.base.as_deref().unwrap_or(Path::new(".")))
			.display()
	);
	if !units.include.is_empty() {
		println!("  include: {}", units.include.join(", "));
	}
	if !units.exclude.is_empty() {
		println!("  exclude: {}", units.exclude.join(", "));
	}
	for file in &units.files {
		println!("  file: {}", file.display());
	}
	println!("  recursive: {}", units.recursive);
	println!();

	if let Some(ref backup) = config.backup {
		println!("[backup]");
		println!("  dir: {}", backup.dir.display());
		println!();
	}

	for (i, rule) in config.rules.iter().enumerate() {
		println!("  Rule {} ({}):", i + 1, rule.id);
		if let Some(ref pattern) = rule.pattern {
			println!("    pattern: {}", pattern);
		}
		if let Some(ref template) = rule.template {
			println!("    template: {}", template);
		}
		if let Some(ref sub) = rule.sub {
			println!("    sub: {}", sub);
		}
		if let Some(ref counter) = rule.counter {
			println!("    counter: start {}, template {:?}", counter.start, counter.template);
		}
		if let Some(limit) = rule.limit {
			println!("    limit: {}", limit);
		}
		println!();
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate(config_path: Option<&Path>) -> Result<ExitCode> {
	let validated = load(config_path).and_then(|loaded| {
		let rules = compile_rules(&loaded.config).context("Failed to compile rules")?;
		UnitSource::from_config(&loaded.config.units, &loaded.base_dir())
			.context("Invalid [units] configuration")?;
		Ok((loaded, rules.len()))
	});

	match validated {
		Ok((loaded, rule_count)) => {
			println!(
				"Configuration is valid: {} ({} rules)",
				loaded.path.display(),
				rule_count
			);
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {:#}", e);
			Ok(ExitCode::FAILURE)
		}
	}
}
