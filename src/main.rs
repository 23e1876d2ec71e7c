use std::process::ExitCode;

use clap::Parser;
use zion_lib::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(e) = zion_lib::logging::init_logging(&config.log) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match zion_lib::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "zion stopped");
            ExitCode::FAILURE
        }
    }
}
