//! wpprobe - WordPress REST API explorer
//!
//! Lists the users, media files and posts a WordPress site exposes through
//! its public REST API, caching responses on disk between runs.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wpprobe::app::{App, RunOutcome};
use wpprobe::cli::{AppConfig, Cli};

/// Sets up logging to stderr, keeping stdout for results.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "wpprobe=debug" } else { "wpprobe=warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            return ExitCode::from(2);
        }
    };

    let mut stdout = io::stdout();
    match app.run(&mut stdout).await {
        Ok(outcome) => {
            if outcome == RunOutcome::NotWordPress {
                eprintln!(
                    "WordPress not detected on the provided host ({}).",
                    app.config().host
                );
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!(error = %e, "failed to write output");
            ExitCode::from(2)
        }
    }
}
