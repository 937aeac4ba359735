use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    lexipage::logging::init().context("init logging")?;

    let cli = lexipage::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        lexipage::cli::Command::Segment(args) => {
            lexipage::inspect::segment(args).context("segment")?;
        }
        lexipage::cli::Command::Paginate(args) => {
            lexipage::inspect::paginate_file(args).context("paginate")?;
        }
        lexipage::cli::Command::Read(args) => {
            lexipage::reader::run(args).await.context("read")?;
        }
    }

    Ok(())
}
