//! resolve command - Discover and report the client location
//!
//! Loads configuration, builds a session context, drives the configured
//! resolver until the location is Ready or the deadline passes, and prints
//! the resulting snapshot.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use locus_core::{
    resolver_from_config, CancellationToken, LocationStatus, LocationUpdater, LocusConfig,
    SessionContext, SessionIdentity,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::output::{OutputFormat, ResolveOutput};

/// The location was not Ready when the command finished
#[derive(Debug, Clone, Copy, Error)]
#[error("Location not ready (status: {status})")]
pub struct NotReady {
    pub status: LocationStatus,
}

impl NotReady {
    pub const EXIT_CODE: i32 = 3;
}

/// Options for resolve command
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Configuration file; defaults and environment only when absent
    pub config_path: Option<PathBuf>,
    /// Client IP overriding `bind_ip`
    pub client_ip: Option<String>,
    /// Deadline overriding `location.wait_ready_ms`
    pub timeout: Option<Duration>,
    pub format: OutputFormat,
}

/// Run the resolve command
///
/// # Errors
///
/// Returns an error if configuration is invalid, the resolver cannot be
/// built, or the location is not Ready when the deadline passes.
pub async fn run(options: &ResolveOptions) -> Result<()> {
    let output = resolve(options).await?;

    if options.format.is_json() {
        let json_str =
            serde_json::to_string_pretty(&output).context("Failed to serialize resolve output")?;
        println!("{json_str}");
    } else {
        println!("{}", output.to_human());
    }

    if output.ready {
        Ok(())
    } else {
        Err(NotReady {
            status: output.snapshot.status(),
        }
        .into())
    }
}

/// Build a session, run discovery and collect the result
///
/// # Errors
///
/// Returns an error if configuration is invalid or the resolver cannot be built.
pub async fn resolve(options: &ResolveOptions) -> Result<ResolveOutput> {
    let mut config = LocusConfig::load(options.config_path.as_deref())
        .await
        .context("Failed to load configuration")?;
    if let Some(ip) = &options.client_ip {
        config.bind_ip = Some(ip.clone());
    }
    let bind_ip = config.parsed_bind_ip()?;
    let client_ip = config.bind_ip.clone().unwrap_or_default();
    let deadline = options
        .timeout
        .unwrap_or_else(|| config.location.wait_ready());

    let context = Arc::new(SessionContext::new());
    if let Some(ip) = bind_ip {
        context.set_bind_ip(ip);
    }
    context.set_identity(SessionIdentity::detect(
        &config.client_name,
        &config.client_version,
        &client_ip,
    ));
    let started = context.mark_take_effect();

    let resolver = resolver_from_config(&config.location)?;
    let resolver_name = resolver.name().to_string();
    let updater = LocationUpdater::from_config(
        Arc::clone(&context),
        resolver,
        client_ip,
        &config.location,
    );

    debug!(resolver = %resolver_name, ?deadline, "resolving location");
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT, stopping discovery");
                cancel.cancel();
            }
        })
    };

    let ready = tokio::select! {
        ready = context.wait_ready_for(deadline) => ready,
        outcome = updater.run(&cancel) => outcome.is_ready(),
    };
    cancel.cancel();
    interrupt.abort();

    context.mark_finish_init();
    let snapshot = (*context.current_location()).clone();

    Ok(ResolveOutput {
        status_code: snapshot.status().code(),
        ready,
        snapshot,
        resolver: resolver_name,
        identity: context.identity().map(|identity| (*identity).clone()),
        take_effect_time: context.take_effect_time(),
        finish_init_time: context.finish_init_time(),
        elapsed_ms: context.since(started).num_milliseconds(),
    })
}
