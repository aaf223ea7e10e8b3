//! berth CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use berth_cli::cli::Cli;
use berth_cli::config::ClientConfig;
use berth_cli::output::{CommandReport, OutputFormat};
use berth_cli::{CliError, Orchestrator};
use berth_proto::CorrelationToken;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::new(cli.output);

    let config = match ClientConfig::resolve(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.debug);
            return report(&format, &e);
        }
    };
    init_tracing(config.debug);

    // One command per process, one task.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&format, &e),
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("berth_cli=debug,berth_proto=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn report(format: &OutputFormat, error: &CliError) -> ExitCode {
    let mut stderr = io::stderr().lock();
    if format.write_error(&mut stderr, error).is_err() {
        eprintln!("error: {error}");
    }
    ExitCode::from(error.exit_code())
}

async fn run(cli: &Cli, config: &ClientConfig) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.output);
    let request = cli.request()?;
    let (verb, kind) = (request.verb, request.kind);

    let orchestrator = Orchestrator::from_config(config, CorrelationToken::new())?;
    let result = orchestrator.go(request).await?;

    let mut stdout = io::stdout().lock();
    format.write(&mut stdout, &CommandReport::new(verb, kind, result))
}
