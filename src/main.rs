use std::io::IsTerminal;

use bbup::cli::{failure_message, init_tracing, run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing for the CLI.
    init_tracing(cli.verbose);
    tracing::info!("CLI application startup: tracing initialised");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("{}", failure_message(e, std::io::stderr().is_terminal()));
            std::process::exit(1);
        }
    }
}
