//! diagprobe CLI.
//!
//! Hosts a diagnostic probe around a child program, runs one-off queries, and
//! shows resolved probe configurations.

use clap::{ArgAction, Args, Parser, Subcommand};
use dp_common::{CallContext, Error, Result};
use dp_core::diag::{self, DiagnosticInterface};
use dp_core::exit_codes::ExitCode;
use dp_core::truncate::truncate;
use dp_core::{DiagnosticProbe, OutputLimit, ProbeConfig, ProbeDefaults, TargetStream};
use std::io::IsTerminal;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "diagprobe", version, about = "Method-boundary diagnostic probe")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Snapshot destination: stdout, stderr, or a file path (appended)
    #[arg(short, long, default_value = "stderr", global = true)]
    output: TargetStream,

    /// Default for `log_timestamp` when the probe arguments omit it
    #[arg(long, global = true)]
    log_timestamp: bool,

    /// Default for `prefix` when the probe arguments omit it
    #[arg(long, global = true)]
    prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program with diagnostic snapshots around it
    Run {
        /// Probe arguments, e.g. "cmd=VM.status;where=beforeAndAfter"
        #[arg(long, env = "DIAGPROBE_ARGS")]
        args: String,
        /// Snapshot this process instead of diagprobe itself
        #[arg(long)]
        pid: Option<u32>,
        /// Program and its arguments
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
    /// Run a single diagnostic command and print its output
    Query {
        /// Diagnostic command name, e.g. VM.status
        command: String,
        /// Print at most this many lines
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        pid: Option<u32>,
    },
    /// List available diagnostic commands
    List {
        #[arg(long)]
        pid: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved probe configuration as JSON
    Config {
        #[arg(long, env = "DIAGPROBE_ARGS")]
        args: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.log_json);
    debug!("diagprobe v{} starting", env!("CARGO_PKG_VERSION"));

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            debug!(code = err.code(), "exiting with error");
            eprintln!("diagprobe: {err}");
            ExitCode::from(&err).as_i32()
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("dp_core={level},dp_config={level},diagprobe={level}"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<i32> {
    let defaults = ProbeDefaults {
        log_timestamp: cli.global.log_timestamp,
        prefix: cli.global.prefix.clone(),
    };

    match cli.command {
        Commands::Run { args, pid, program } => {
            let config = ProbeConfig::from_args(&args, &defaults)?;
            let interface = match pid {
                Some(pid) => match diag::interface_for_pid(pid) {
                    Ok(interface) => Some(interface),
                    Err(err) => {
                        warn!(pid, error = %err, "target not inspectable; probe will call through");
                        None
                    }
                },
                None => diag::platform_interface(),
            };
            let sink = cli.global.output.open()?;
            let probe = DiagnosticProbe::with_interface(config, interface, sink);

            let (bin, rest) = program
                .split_first()
                .ok_or_else(|| Error::Config("no program given".to_string()))?;
            let context = CallContext::new(program.join(" "));
            let status = probe.wrap(&context, || Command::new(bin).args(rest).status())?;
            debug!(?status, "wrapped program finished");
            Ok(exit_status_code(status))
        }
        Commands::Query {
            command,
            limit,
            pid,
        } => {
            let interface = require_interface(pid)?;
            let text = diag::query(interface.as_ref(), &command)?;
            let limit = limit.map_or(OutputLimit::Unlimited, OutputLimit::Lines);
            print!("{}", truncate(&text, limit));
            Ok(ExitCode::Clean.as_i32())
        }
        Commands::List { pid, json } => {
            let interface = require_interface(pid)?;
            let commands = interface.commands();
            if json {
                println!("{}", serde_json::to_string_pretty(&commands)?);
            } else {
                for info in commands {
                    println!("{:<16} {}", info.name, info.description);
                }
            }
            Ok(ExitCode::Clean.as_i32())
        }
        Commands::Config { args } => {
            let config = ProbeConfig::from_args(&args, &defaults)?;
            if let Some(warning) = config.placement_warning() {
                eprintln!("{warning}");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::Clean.as_i32())
        }
    }
}

fn require_interface(pid: Option<u32>) -> Result<Arc<dyn DiagnosticInterface>> {
    match pid {
        Some(pid) => diag::interface_for_pid(pid),
        None => diag::platform_interface().ok_or_else(|| {
            Error::DiagnosticUnavailable("this host has no diagnostic interface".to_string())
        }),
    }
}

#[cfg(unix)]
fn exit_status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(ExitCode::InternalError.as_i32())
}

#[cfg(not(unix))]
fn exit_status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(ExitCode::InternalError.as_i32())
}
