use clap::Parser;
use std::process::ExitCode;

use wax_catalog::cli::{self, Cli};
use wax_catalog::error::AppError;
use wax_catalog::logging;
use wax_catalog::startup::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let app_config = match args.load_config() {
        Ok(config) => config,
        Err(e) => return fail(&AppError::InternalConfiguration(e)),
    };

    if let Err(e) = logging::init_tracing(&app_config.logging) {
        eprintln!("{}", e);
    }

    let context = match AppContext::build(&app_config).await {
        Ok(context) => context,
        Err(e) => return fail(&e),
    };

    let result = cli::execute(&args, &context).await;

    if let Err(e) = context.backend.cleanup().await {
        tracing::warn!("Failed to release connections: {}", e);
    }

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(output) => {
                println!("{}", output);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&AppError::InternalServer(e.to_string())),
        },
        Err(e) => fail(&e),
    }
}

fn fail(error: &AppError) -> ExitCode {
    eprintln!("{}", error.to_json());
    ExitCode::from(cli::exit_code(error) as u8)
}
