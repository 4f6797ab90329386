use fpsift_cli::commands::{execute, Command};
use fpsift_cli::{parse_args, AppConfig, CliArgs, CliResult, CommandOutput, ParsedArgs};
use std::io::Read;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FPSIFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &CliArgs) -> CliResult<CommandOutput> {
    let command = Command::parse(cli.command.as_deref())?;
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    debug!(config = %config.summary(), "loaded configuration");

    if let Err(e) = fpsift_core::init_thread_pool(config.threads) {
        warn!(error = %e, "could not size the thread pool, using rayon defaults");
    }

    let mut input = String::new();
    if command.reads_stdin() {
        std::io::stdin().read_to_string(&mut input)?;
    }
    execute(command, &input, &config)
}

/// Print one JSON line and map success onto the exit code.
fn emit(output: CommandOutput, code: ExitCode) -> ExitCode {
    match output.to_json() {
        Ok(line) => {
            println!("{}", line);
            code
        }
        Err(e) => {
            println!("{{\"success\":false,\"error\":\"could not encode output\"}}");
            warn!(error = %e, "serialization failed");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_args(std::env::args_os()) {
        Ok(ParsedArgs::Run(cli)) => cli,
        Ok(ParsedArgs::Info(text)) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
        Err(e) => return emit(CommandOutput::failure(e.to_string()), ExitCode::FAILURE),
    };
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => emit(output, ExitCode::SUCCESS),
        Err(e) => emit(CommandOutput::failure(e.to_string()), ExitCode::FAILURE),
    }
}
