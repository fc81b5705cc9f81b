use anyhow::Result;
use clap::Parser;
use oglive_probe::run;
use oglive_probe::Cli;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    run(cli).await
}
