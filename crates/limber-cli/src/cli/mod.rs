mod commands;
mod config;

use clap::Parser;
use limber_core::LimberError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let limber_error = error.as_limber_error();
            eprintln!("{}", limber_error.diagnostic_line());
            limber_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing();
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Log records go to stderr so JSON written to stdout stays parseable.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(name = "limber", about = "Limber angular power spectra of galaxy samples", version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compute Cgg and Ckg of one galaxy sample, decomposed by bias monomial
    Spectra(commands::SpectraArgs),
    /// Print the fiducial effective redshift of every galaxy sample
    Zeff(commands::ZeffArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Spectra(args) => commands::run_spectra_command(args),
        CliCommand::Zeff(args) => commands::run_zeff_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(LimberError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<LimberError> for CliError {
    fn from(error: LimberError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_limber_error(&self) -> LimberError {
        match self {
            Self::Usage(message) => LimberError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => LimberError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
