//! Atomically swappable holder of the current [`LocationSnapshot`].
//!
//! Readers load the current snapshot without locking. Writers build a complete
//! new snapshot and store it in one step; nothing is ever mutated in place.
//!
//! # Transition rule
//!
//! | current            | proposed    | result             |
//! |--------------------|-------------|--------------------|
//! | Init, Error, Empty | any         | replaced           |
//! | Ready              | Ready       | replaced (refresh) |
//! | Ready              | not Ready   | discarded          |
//!
//! # Single writer
//!
//! Reading the current status and storing the proposal are two separate atomic
//! steps, not a compare-and-swap. The cell assumes one writer (the location
//! resolver); two concurrent writers could interleave between the steps.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::{
    error::LocationError,
    location::{Location, LocationSnapshot, LocationStatus},
};

/// Outcome of offering a discovery result to the cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before the proposal
    pub previous: LocationStatus,
    /// Status derived from the proposal
    pub proposed: LocationStatus,
    /// Whether the proposal replaced the current snapshot
    pub accepted: bool,
    /// The cell moved from a non-ready status to Ready
    pub became_ready: bool,
}

/// Holder of the current location snapshot
#[derive(Debug)]
pub struct LocationCell {
    current: ArcSwap<LocationSnapshot>,
}

impl LocationCell {
    /// Create a cell holding the initial snapshot
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(LocationSnapshot::initial()),
        }
    }

    /// The most recently accepted snapshot. Never blocks.
    pub fn current(&self) -> Arc<LocationSnapshot> {
        self.current.load_full()
    }

    /// Status of the current snapshot
    pub fn status(&self) -> LocationStatus {
        self.current.load().status()
    }

    /// Offer a discovery result, applying the monotonic readiness rule
    pub fn propose(&self, location: Option<Location>, err: Option<LocationError>) -> Transition {
        let next = LocationSnapshot::from_result(location, err);
        let proposed = next.status();
        let previous = self.status();

        let (accepted, became_ready) = match previous {
            LocationStatus::Ready => (proposed == LocationStatus::Ready, false),
            LocationStatus::Init | LocationStatus::Error | LocationStatus::Empty => {
                (true, proposed == LocationStatus::Ready)
            }
        };

        if accepted {
            self.current.store(Arc::new(next));
        }

        if became_ready {
            info!(from = %previous, "location became ready");
        } else if accepted {
            debug!(from = %previous, to = %proposed, "location snapshot replaced");
        } else {
            debug!(proposed = %proposed, "proposal discarded: location already ready");
        }

        Transition {
            previous,
            proposed,
            accepted,
            became_ready,
        }
    }
}

impl Default for LocationCell {
    fn default() -> Self {
        Self::new()
    }
}
