//! Locus CLI - resolve and report the location of a service-discovery client
//!
//! Binary name: `locus`

use std::process;

use locus::cli::{exit_code, format_error, run_cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli().await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {}", format_error(&err));
        }

        #[allow(clippy::exit)]
        process::exit(exit_code(&err));
    }
}
