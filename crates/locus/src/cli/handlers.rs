//! CLI command handlers that bridge between `clap` and internal logic

use std::{path::PathBuf, process, time::Duration};

use anyhow::Result;
use clap::ArgMatches;

use crate::{
    cli::commands::build_cli,
    commands::{
        identity::{self, IdentityOptions},
        resolve::{self, NotReady, ResolveOptions},
    },
    output::OutputFormat,
};

/// Format an error for user display (no stack traces)
pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if let Some(source) = err.source() {
        let source_msg = source.to_string();
        if !msg.contains(&source_msg) && !source_msg.is_empty() {
            return format!("{msg}\nCause: {source_msg}");
        }
    }
    msg
}

/// Process exit code for a failed command.
///
/// - 1: configuration or input errors (and anything unclassified)
/// - 2: system and transport errors
/// - 3: the location was not Ready
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<NotReady>().is_some() {
        return NotReady::EXIT_CODE;
    }
    err.downcast_ref::<locus_core::Error>()
        .map_or(1, locus_core::Error::exit_code)
}

pub async fn handle_resolve(sub_m: &ArgMatches) -> Result<()> {
    let options = ResolveOptions {
        config_path: sub_m.get_one::<PathBuf>("config").cloned(),
        client_ip: sub_m.get_one::<String>("ip").cloned(),
        timeout: sub_m
            .get_one::<u64>("timeout-ms")
            .map(|ms| Duration::from_millis(*ms)),
        format: OutputFormat::from_json_flag(sub_m.get_flag("json")),
    };
    resolve::run(&options).await
}

pub async fn handle_identity(sub_m: &ArgMatches) -> Result<()> {
    let options = IdentityOptions {
        format: OutputFormat::from_json_flag(sub_m.get_flag("json")),
    };
    identity::run(options).await
}

pub async fn run_cli() -> Result<()> {
    let matches = match build_cli().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            use clap::error::ErrorKind;
            let should_exit_zero =
                matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            let _ = e.print();
            #[allow(clippy::exit)]
            process::exit(if should_exit_zero { 0 } else { 2 });
        }
    };

    match matches.subcommand() {
        Some(("resolve", sub_m)) => handle_resolve(sub_m).await,
        Some(("identity", sub_m)) => handle_identity(sub_m).await,
        _ => Err(anyhow::anyhow!("Unknown command")),
    }
}
