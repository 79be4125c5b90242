use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use ctd_params_core::dict::override_args;
use ctd_params_core::{
    ArgDict, DirectiveNames, DirectiveValue, Enforcement, EnforcementPolicy, Model, args_from_file,
    parse_directives,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Flag prefix for parameters passed after `--`.
const FLAG_PREFIX: &str = "--";

/// Output format for argument dictionaries.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "ctd-params")]
#[command(about = "Inspect CTD tool descriptions and validate arguments against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every parameter of a tool with its command-line flag.
    List(ListArgs),
    /// Print the default values of a tool's parameters.
    Defaults(DefaultsArgs),
    /// Extract argument values from a CTD file without a schema.
    Extract(ExtractArgs),
    /// Parse and validate command-line arguments against a tool.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// CTD file describing the tool.
    #[arg(long)]
    ctd: PathBuf,
}

#[derive(Debug, Args)]
struct DefaultsArgs {
    /// CTD file describing the tool.
    #[arg(long)]
    ctd: PathBuf,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// CTD file to read values from.
    #[arg(long)]
    input: PathBuf,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// CTD file describing the tool.
    #[arg(long)]
    ctd: PathBuf,
    /// YAML enforcement policy; levels given on the command line override it.
    #[arg(long)]
    policy: Option<PathBuf>,
    /// Level for missing required arguments (0 ignore, 1 warn, 2 reject).
    #[arg(long)]
    required: Option<u8>,
    /// Level for values of the wrong type.
    #[arg(long)]
    types: Option<u8>,
    /// Level for restriction violations.
    #[arg(long)]
    restrictions: Option<u8>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Tool arguments, e.g. `-- --group:param 3 --write_param_ctd out.ctd`.
    #[arg(last = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::List(args) => run_list(args),
        Command::Defaults(args) => run_defaults(args),
        Command::Extract(args) => run_extract(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Library warnings are surfaced as `warning:` lines, so its own events are
/// quiet unless `RUST_LOG` asks for them.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,ctd_params_core=error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_list(args: ListArgs) -> Result<(), String> {
    let model = load_model(&args.ctd)?;
    println!("{} {}", model.name(), model.version());
    for param in model.list_parameters() {
        println!();
        println!("{}", param.flag_name(FLAG_PREFIX));
        for line in param.summary().lines() {
            println!("  {line}");
        }
    }
    Ok(())
}

fn run_defaults(args: DefaultsArgs) -> Result<(), String> {
    let model = load_model(&args.ctd)?;
    println!("{}", render(&model.get_defaults(), args.format)?);
    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<(), String> {
    let values = args_from_file(&args.input)
        .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?;
    println!("{}", render(&values, args.format)?);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let model = load_model(&args.ctd)?;
    let policy = resolve_policy(&args)?;

    let directives = parse_directives(&args.args, &DirectiveNames::default());
    let parsed = model.parse_command_line(&directives.remainder, FLAG_PREFIX);
    for token in &parsed.remainder {
        warn!(token = token.as_str(), "Ignoring unrecognized argument");
    }

    let from_file = match &directives.input_ctd {
        Some(DirectiveValue::File(path)) => args_from_file(path)
            .map_err(|err| format!("Failed to read '{path}': {err}"))?,
        Some(DirectiveValue::Flag) => {
            return Err("--input_ctd requires a file name".to_string());
        }
        None => ArgDict::new(),
    };
    let merged = override_args(&[&from_file, &parsed.args]);

    let outcome = model
        .validate_report(&merged, policy)
        .map_err(|err| err.to_string())?;
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    if let Some(directive) = &directives.write_tool_ctd {
        let path = output_path(&model, directive);
        model
            .write_document(&path, None, None)
            .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
        debug!(path = %path.display(), "Wrote tool CTD");
    }
    if let Some(directive) = &directives.write_param_ctd {
        let path = output_path(&model, directive);
        model
            .write_document(&path, Some(&outcome.args), None)
            .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
        debug!(path = %path.display(), "Wrote parameter CTD");
    }

    println!("{}", render(&outcome.args, args.format)?);
    Ok(())
}

fn load_model(path: &Path) -> Result<Model, String> {
    Model::load_from_document(path).map_err(|err| format!("Failed to load '{}': {err}", path.display()))
}

fn resolve_policy(args: &ValidateArgs) -> Result<EnforcementPolicy, String> {
    let mut policy = match &args.policy {
        Some(path) => EnforcementPolicy::load(path)
            .map_err(|err| format!("Failed to load policy '{}': {err}", path.display()))?,
        None => EnforcementPolicy::default(),
    };
    let level = |value: u8| Enforcement::try_from(value).map_err(|err| err.to_string());
    if let Some(required) = args.required {
        policy.required = level(required)?;
    }
    if let Some(types) = args.types {
        policy.types = level(types)?;
    }
    if let Some(restrictions) = args.restrictions {
        policy.restrictions = level(restrictions)?;
    }
    Ok(policy)
}

/// File named by a directive, or `<tool>.ctd` when it was given bare.
fn output_path(model: &Model, directive: &DirectiveValue) -> PathBuf {
    match directive.file() {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{}.ctd", model.name())),
    }
}

fn render(values: &ArgDict, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(values)
            .map_err(|err| format!("JSON serialization failed: {err}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(values).map_err(|err| format!("YAML serialization failed: {err}"))
        }
    }
}
