use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use clap::{Args, Parser, Subcommand};
use pipeline_schema_core::{Interactive, LintReport, Prompter, lint, validate_instance};
use pipeline_schema_store::{SchemaLocation, load_parameter_file, load_schema_value};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod context;
mod prompt;
mod resolver;
mod web;

use context::BuildContext;
use prompt::TerminalPrompter;
use web::HttpTransport;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Report format for `lint` and `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pipeline-schema")]
#[command(about = "Build, lint and validate pipeline parameter schemas")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or update a pipeline schema from its configuration.
    Build(BuildArgs),
    /// Check that a schema is well formed.
    Lint(LintArgs),
    /// Check a parameter file against a schema.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Pipeline directory.
    #[arg(default_value = ".")]
    pipeline_dir: PathBuf,
    /// Accept every change and skip the web builder.
    #[arg(long)]
    no_prompts: bool,
    /// Skip syncing with the pipeline config and go straight to the web builder.
    #[arg(long)]
    web_only: bool,
    /// Web builder address, overriding the tool config.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Schema file or pipeline directory.
    path: PathBuf,
    /// Report format.
    #[arg(long, default_value = "text")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema file or pipeline directory.
    path: PathBuf,
    /// Parameter file (JSON or YAML).
    params_file: PathBuf,
    /// Report format.
    #[arg(long, default_value = "text")]
    format: CliOutputFormat,
}

/// Machine-readable outcome of `lint` / `validate`.
#[derive(Debug, Serialize)]
struct CheckReport {
    schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params_file: Option<String>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    param_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Lint(args) => run_lint(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run_build(args: BuildArgs) -> Result<(), String> {
    let mut ctx = BuildContext::open(&args.pipeline_dir, args.url)?;

    if !ctx.location().exists() {
        info!("No existing schema found - creating a new one from the template");
        ctx.create_skeleton()?;
    }

    if let Err(err) = ctx.lint_schema() {
        return Err(lint_failure(ctx.from_scratch(), &err));
    }

    if !args.web_only {
        let auto_accept = args.no_prompts || ctx.from_scratch();
        let policy = Interactive::new(TerminalPrompter::stdin()).auto_accept(auto_accept);
        ctx.sync_with_pipeline(policy)?;
        ctx.save()?;
    }

    if !args.no_prompts {
        let mut prompter = TerminalPrompter::stdin();
        if prompter.confirm("Launch web builder for customisation and editing?", true) {
            let cancel = AtomicBool::new(false);
            ctx.launch_web_builder(HttpTransport::new(), PACKAGE_VERSION, &cancel)?;
        }
    }

    Ok(())
}

fn lint_failure(from_scratch: bool, err: &str) -> String {
    if from_scratch {
        format!("Generated schema is invalid: {err}")
    } else {
        format!("Existing schema found, but it is invalid: {err}")
    }
}

fn run_lint(args: LintArgs) -> Result<(), String> {
    let location = SchemaLocation::resolve(&args.path);
    let outcome = lint_location(&location);

    let report = CheckReport {
        schema: location.schema_path().display().to_string(),
        params_file: None,
        valid: outcome.is_ok(),
        param_count: outcome.as_ref().ok().map(|r| r.flat.properties.len()),
        defaults: outcome.as_ref().ok().map(|r| r.defaults.len()),
        error: outcome.as_ref().err().cloned(),
    };
    emit(&report, args.format)?;

    let linted = outcome?;
    if args.format == CliOutputFormat::Text {
        println!(
            "Schema '{}' is valid: {} param(s), {} with defaults.",
            location.schema_path().display(),
            linted.flat.properties.len(),
            linted.defaults.len()
        );
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let location = SchemaLocation::resolve(&args.path);
    let outcome = lint_location(&location).and_then(|linted| {
        let params = load_parameter_file(&args.params_file).map_err(|e| e.to_string())?;
        validate_instance(&linted.flat, &params).map_err(|e| e.to_string())?;
        Ok(params.len())
    });

    let report = CheckReport {
        schema: location.schema_path().display().to_string(),
        params_file: Some(args.params_file.display().to_string()),
        valid: outcome.is_ok(),
        param_count: outcome.as_ref().ok().copied(),
        defaults: None,
        error: outcome.as_ref().err().cloned(),
    };
    emit(&report, args.format)?;

    let checked = outcome?;
    if args.format == CliOutputFormat::Text {
        println!(
            "Parameters in '{}' are valid ({checked} checked).",
            args.params_file.display()
        );
    }
    Ok(())
}

fn lint_location(location: &SchemaLocation) -> Result<LintReport, String> {
    let path: &Path = location.require_existing().map_err(|e| e.to_string())?;
    let raw = load_schema_value(path).map_err(|e| e.to_string())?;
    lint(&raw).map_err(|e| e.to_string())
}

/// Prints the JSON report. Text output is printed by the caller on success
/// and by `main` on failure.
fn emit(report: &CheckReport, format: CliOutputFormat) -> Result<(), String> {
    if format == CliOutputFormat::Json {
        let raw = serde_json::to_string_pretty(report)
            .map_err(|err| format!("Failed to serialize report: {err}"))?;
        println!("{raw}");
    }
    Ok(())
}
