use std::process::ExitCode;

use clap::Parser;

use vatdesk_cli::Cli;

fn main() -> ExitCode {
    vatdesk_observability::init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    match vatdesk_cli::run(cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
