use std::process::ExitCode;

use clap::Parser;

use gup::cli::{self, Cli};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = gup::logging::init();

    let code = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(cli::run(cli));

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
