//! Session identity
//!
//! Identifies one running client instance. Built once when the session starts
//! and never modified afterwards.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Environment variable holding the pod name when running in a container
pub const POD_NAME_ENV: &str = "POD_NAME";

/// Identity token of a client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// IP address the client is bound to
    pub local_ip: String,
    /// Operating system process id
    pub pid: u32,
    /// Unique id of this session
    pub uid: String,
    /// Client name reported to the server
    pub client: String,
    /// Client version reported to the server
    pub version: String,
    pub pod_name: String,
    pub host_name: String,
}

impl SessionIdentity {
    /// Detect the identity of the current process.
    ///
    /// The pod name comes from `POD_NAME` and falls back to the host name.
    /// A host name that cannot be read is left empty.
    pub fn detect(
        client: impl Into<String>,
        version: impl Into<String>,
        local_ip: impl Into<String>,
    ) -> Self {
        let host_name = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pod_name = std::env::var(POD_NAME_ENV)
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| host_name.clone());

        Self {
            local_ip: local_ip.into(),
            pid: std::process::id(),
            uid: Uuid::new_v4().to_string(),
            client: client.into(),
            version: version.into(),
            pod_name,
            host_name,
        }
    }
}
