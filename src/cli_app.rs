//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use status_line_helper::collectors::{CollectorKind, CollectorRegistry, CollectorSet};
use status_line_helper::core::config::Config;
use status_line_helper::core::errors::SlhError;
use status_line_helper::daemon::loop_main::{DaemonArgs, StatusDaemon};
use status_line_helper::daemon::sink::WriteSink;
use status_line_helper::platform::pal::{Platform, detect_platform};

/// Status-line helper: prints one status line per refresh interval.
#[derive(Debug, Parser)]
#[command(
    name = "slh",
    author,
    version,
    about = "Status Line Helper - CPU, memory, WiFi and clock for your status bar",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the status line every interval until stopped.
    Run(RunArgs),
    /// Run each collector once and report what it returns.
    Check,
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Print a single line and exit.
    #[arg(long)]
    once: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
    /// Show effective-vs-default config diff.
    Diff,
}

#[derive(Debug, Clone, Args)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<SlhError> for CliError {
    fn from(err: SlhError) -> Self {
        match err {
            SlhError::InvalidConfig { .. }
            | SlhError::MissingConfig { .. }
            | SlhError::ConfigParse { .. }
            | SlhError::InvalidFormat { .. }
            | SlhError::MissingArgument { .. } => Self::User(err.to_string()),
            SlhError::Serialization { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_status_line(cli, args),
        Command::Check => run_check(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_status_line(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        eprintln!(
            "[SLH-DAEMON] {} records, interval {}ms, config {}",
            config.status.args().len(),
            config.status.interval(),
            Config::resolve_path(cli.config.as_deref()).display()
        );
    }

    let daemon_args = DaemonArgs {
        once: args.once,
        config_path: cli.config.clone(),
    };
    let mut daemon = StatusDaemon::init(config, daemon_args, WriteSink::stdout())?;
    daemon.run()?;
    Ok(())
}

fn run_check(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let table = &config.status;
    let platform: Arc<dyn Platform> = detect_platform()?;
    let collectors = CollectorSet::new(&platform);

    // CPU load needs a baseline sample one interval before the real one.
    if table
        .args()
        .iter()
        .any(|record| record.collector() == CollectorKind::CpuPerc)
    {
        let _ = collectors.collector(CollectorKind::CpuPerc).collect(None);
        thread::sleep(Duration::from_millis(table.interval()));
    }

    let mut rows = Vec::with_capacity(table.args().len());
    for (index, record) in table.args().iter().enumerate() {
        let outcome = collectors
            .collector(record.collector())
            .collect(record.argument());
        rows.push((index, record, outcome));
    }
    let unavailable = rows.iter().filter(|(_, _, outcome)| outcome.is_err()).count();

    match output_mode(cli) {
        OutputMode::Human => {
            for (index, record, outcome) in &rows {
                let label = match record.argument() {
                    Some(arg) => format!("{}({arg})", record.collector()),
                    None => record.collector().to_string(),
                };
                match outcome {
                    Ok(value) => println!("{index:>2}  {label:<24} {}", value.green()),
                    Err(err) if cli.verbose => {
                        println!("{index:>2}  {label:<24} {}", err.to_string().yellow());
                    }
                    Err(_) => println!("{index:>2}  {label:<24} {}", table.unknown_str().yellow()),
                }
            }
            if !cli.quiet {
                println!();
                println!(
                    "{} of {} collectors available",
                    rows.len() - unavailable,
                    rows.len()
                );
            }
        }
        OutputMode::Json => {
            let records: Vec<Value> = rows
                .iter()
                .map(|(index, record, outcome)| match outcome {
                    Ok(value) => json!({
                        "index": index,
                        "function": record.collector().name(),
                        "argument": record.argument(),
                        "available": true,
                        "value": value,
                    }),
                    Err(err) => json!({
                        "index": index,
                        "function": record.collector().name(),
                        "argument": record.argument(),
                        "available": false,
                        "error_code": err.code(),
                        "error": err.to_string(),
                    }),
                })
                .collect();
            let payload = json!({
                "command": "check",
                "records": records,
                "unavailable": unavailable,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = Config::resolve_path(cli.config.as_deref());
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; built-in table will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                let source = Config::resolve_path(cli.config.as_deref());

                match output_mode(cli) {
                    OutputMode::Human => {
                        if !cli.quiet {
                            println!("{}", "Configuration is valid.".green());
                            println!("  Source: {}", source.display());
                            println!("  Records: {}", config.status.args().len());
                            println!("  Hash: {hash}");
                        }
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": source.to_string_lossy(),
                            "records": config.status.args().len(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red());
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error_code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
        Some(ConfigCommand::Diff) => {
            let effective = Config::load(cli.config.as_deref())?;
            let defaults = Config::default();
            let eff_json = serde_json::to_value(&effective)?;
            let def_json = serde_json::to_value(&defaults)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    if effective == defaults {
                        println!("No differences from defaults.");
                    } else {
                        println!("--- defaults");
                        println!(
                            "+++ effective ({})",
                            Config::resolve_path(cli.config.as_deref()).display()
                        );
                        println!();
                        let mut out = io::stdout().lock();
                        write_json_diff(&mut out, "", &def_json, &eff_json)?;
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config diff",
                        "has_differences": effective != defaults,
                        "effective": eff_json,
                        "defaults": def_json,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

/// Write a recursive diff of two JSON values, one changed leaf per line.
///
/// Arrays are compared whole, so a changed record list shows as one entry.
fn write_json_diff<W: Write>(
    out: &mut W,
    prefix: &str,
    default: &Value,
    effective: &Value,
) -> io::Result<()> {
    match (default, effective) {
        (Value::Object(def_map), Value::Object(eff_map)) => {
            let mut keys: Vec<&String> = def_map.keys().chain(eff_map.keys()).collect();
            keys.sort();
            keys.dedup();

            for key in keys {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match (def_map.get(key), eff_map.get(key)) {
                    (Some(d), Some(e)) if d != e => write_json_diff(out, &path, d, e)?,
                    (Some(d), None) => writeln!(out, "- {path}: {d}")?,
                    (None, Some(e)) => writeln!(out, "+ {path}: {e}")?,
                    _ => {}
                }
            }
        }
        _ => {
            if default != effective {
                writeln!(out, "- {prefix}: {default}")?;
                writeln!(out, "+ {prefix}: {effective}")?;
            }
        }
    }
    Ok(())
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("slh {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "slh",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SLH_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
