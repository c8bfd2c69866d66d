//! identity command - Print the detected session identity

use anyhow::{Context, Result};
use locus_core::{LocusConfig, SessionIdentity};

use crate::output::{identity_to_human, OutputFormat};

/// Options for identity command
#[derive(Debug, Clone, Copy)]
pub struct IdentityOptions {
    pub format: OutputFormat,
}

/// Run the identity command
///
/// Client name, version and bind address come from defaults and `LOCUS_*`
/// environment overrides.
///
/// # Errors
///
/// Returns an error if the environment overrides are invalid
pub async fn run(options: IdentityOptions) -> Result<()> {
    let config = LocusConfig::load(None)
        .await
        .context("Failed to load configuration")?;
    let identity = SessionIdentity::detect(
        &config.client_name,
        &config.client_version,
        config.bind_ip.unwrap_or_default(),
    );

    if options.format.is_json() {
        let json_str = serde_json::to_string_pretty(&identity)
            .context("Failed to serialize identity output")?;
        println!("{json_str}");
    } else {
        println!("{}", identity_to_human(&identity));
    }
    Ok(())
}
