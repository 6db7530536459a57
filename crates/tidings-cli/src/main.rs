use clap::Parser;
use std::process::ExitCode;
use tidings_cli::{CliArgs, TidingsCli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Logging is installed by `run`, so config errors go straight to stderr.
    let cli = match TidingsCli::from_args("tidings", &args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("tidings: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
