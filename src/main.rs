use std::process::ExitCode;

use proton_helper::{app, Config, Logger};
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let logger = Logger::from_path(config.log_path.clone());

    let result = app::run(logger, |popups| async move {
        popups
            .execute("HELLO", "sh -c \"echo hello && sleep 5 && echo bye\"")
            .await
    });

    match result {
        Ok(code) => {
            info!("demo command exited with {}", code);
            if code == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
