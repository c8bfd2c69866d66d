//! Output shapes and formatting for CLI commands

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use locus_core::{LocationSnapshot, SessionIdentity};
use serde::{Deserialize, Serialize};

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured, machine-readable
    Json,
    /// Terminal-friendly text
    Human,
}

impl OutputFormat {
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

/// Result of `locus resolve`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutput {
    #[serde(flatten)]
    pub snapshot: LocationSnapshot,
    pub status_code: u32,
    pub ready: bool,
    pub resolver: String,
    pub identity: Option<SessionIdentity>,
    pub take_effect_time: Option<DateTime<Utc>>,
    pub finish_init_time: Option<DateTime<Utc>>,
    pub elapsed_ms: i64,
}

impl ResolveOutput {
    /// Render for a terminal
    pub fn to_human(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Status:   {}", self.snapshot.status());
        match self.snapshot.location() {
            Some(location) => {
                let _ = writeln!(text, "Location: {location}");
            }
            None => {
                let _ = writeln!(text, "Location: (unknown)");
            }
        }
        if let Some(err) = self.snapshot.last_error() {
            let _ = writeln!(text, "Error:    {err}");
        }
        let _ = writeln!(text, "Resolver: {}", self.resolver);
        if let Some(identity) = &self.identity {
            let _ = writeln!(
                text,
                "Client:   {} {} (pid {}, session {})",
                identity.client, identity.version, identity.pid, identity.uid
            );
        }
        let _ = write!(text, "Elapsed:  {} ms", self.elapsed_ms);
        text
    }
}

/// Render a session identity for a terminal
pub fn identity_to_human(identity: &SessionIdentity) -> String {
    let local_ip = if identity.local_ip.is_empty() {
        "(unbound)"
    } else {
        identity.local_ip.as_str()
    };
    format!(
        "Client:   {} {}\nSession:  {}\nPid:      {}\nLocal IP: {local_ip}\nHost:     {}\nPod:      {}",
        identity.client,
        identity.version,
        identity.uid,
        identity.pid,
        identity.host_name,
        identity.pod_name
    )
}
