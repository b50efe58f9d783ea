// xref - cross-source verification from the command line

mod exit_codes;
mod verify;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_INPUT_PARSE, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "xref")]
#[command(about = "Reconcile stored records against independently observed sources")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log filter (e.g. "info", "crossref_recon=debug")
    #[arg(long, global = true, env = "XREF_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify records against source observations
    #[command(after_help = "\
Examples:
  xref verify run engine.toml --records records.json --observations observations.json
  xref verify validate engine.toml
  xref verify similarity \"Acme Markets\" \"ACME Market\"")]
    Verify {
        #[command(subcommand)]
        command: verify::VerifyCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  crossref-recon ",
        env!("CARGO_PKG_VERSION"),
        "\ncontract_version(verify): 1",
    )
}

/// Logs go to stderr so stdout stays a single JSON value under --json.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: xref <command> [options]");
            eprintln!("       xref --help for more information");
            Ok(())
        }
        Some(Commands::Verify { command }) => verify::cmd_verify(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT_PARSE, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its registry exit code.
    pub fn recon(err: crossref_recon::ReconError) -> Self {
        Self {
            code: exit_codes::recon_exit_code(&err),
            message: err.to_string(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
