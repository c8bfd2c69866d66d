//! Location values and the immutable snapshot published by the context.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::LocationError;

/// Region / zone / campus triple describing where this client runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub campus: String,
}

impl Location {
    /// Create a location from its three parts
    pub fn new(
        region: impl Into<String>,
        zone: impl Into<String>,
        campus: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            zone: zone.into(),
            campus: campus.into(),
        }
    }

    /// Location with only the region set
    pub fn region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }

    /// True when none of region, zone or campus is set
    pub fn is_empty(&self) -> bool {
        self.region.is_empty() && self.zone.is_empty() && self.campus.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{region={}, zone={}, campus={}}}",
            self.region, self.zone, self.campus
        )
    }
}

/// Discovery status of the current location
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LocationStatus {
    /// No discovery attempt has completed yet
    Init,
    /// The last attempt failed
    Error,
    /// A non-empty location is known
    Ready,
    /// The resolver answered but knew nothing about this client
    Empty,
}

impl LocationStatus {
    /// Stable numeric code: Init = 0, Error = 1, Ready = 2, Empty = 3
    pub const fn code(self) -> u32 {
        match self {
            Self::Init => 0,
            Self::Error => 1,
            Self::Ready => 2,
            Self::Empty => 3,
        }
    }

    /// Inverse of [`LocationStatus::code`]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Init),
            1 => Some(Self::Error),
            2 => Some(Self::Ready),
            3 => Some(Self::Empty),
            _ => None,
        }
    }

    /// Status implied by a discovery result
    pub fn derive(location: Option<&Location>, err: Option<&LocationError>) -> Self {
        match (err, location) {
            (Some(_), _) => Self::Error,
            (None, Some(loc)) if !loc.is_empty() => Self::Ready,
            (None, _) => Self::Empty,
        }
    }
}

/// Immutable view of what is known about the client's location.
///
/// A snapshot is never modified after construction; updates build a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    location: Option<Location>,
    last_error: Option<LocationError>,
    status: LocationStatus,
}

impl LocationSnapshot {
    /// The snapshot a fresh context starts with
    pub const fn initial() -> Self {
        Self {
            location: None,
            last_error: None,
            status: LocationStatus::Init,
        }
    }

    /// Build a snapshot from a discovery result, deriving its status
    pub fn from_result(location: Option<Location>, last_error: Option<LocationError>) -> Self {
        let status = LocationStatus::derive(location.as_ref(), last_error.as_ref());
        Self {
            location,
            last_error,
            status,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn last_error(&self) -> Option<&LocationError> {
        self.last_error.as_ref()
    }

    pub const fn status(&self) -> LocationStatus {
        self.status
    }

    /// At least one discovery attempt has been recorded
    pub fn is_initialized(&self) -> bool {
        self.status != LocationStatus::Init
    }

    pub fn is_ready(&self) -> bool {
        self.status == LocationStatus::Ready
    }
}

impl Default for LocationSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
