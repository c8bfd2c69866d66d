//! One-shot broadcast notifier.
//!
//! A [`BroadcastOnce`] is signalled at most once and stays signalled forever.
//! Any number of tasks may wait on it, before or after the signal; all of them
//! are released by the single firing.
//!
//! Release is carried by a [`CancellationToken`] that is cancelled exactly once
//! under a [`Once`] guard, so waiters can never observe a half-fired notifier
//! and a wakeup cannot be lost: a waiter registering after the fire sees the
//! token already cancelled.

use std::sync::Once;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Signal once, wait many
#[derive(Debug)]
pub struct BroadcastOnce {
    name: &'static str,
    guard: Once,
    release: CancellationToken,
}

impl BroadcastOnce {
    /// Create an unfired notifier. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            guard: Once::new(),
            release: CancellationToken::new(),
        }
    }

    /// Name used in log records
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Fire the notifier.
    ///
    /// Idempotent: only the first call has an effect. Returns `true` if this
    /// call performed the transition. Concurrent losers return only after the
    /// winner has finished releasing waiters.
    pub fn signal(&self) -> bool {
        let mut fired_here = false;
        self.guard.call_once(|| {
            self.release.cancel();
            fired_here = true;
        });
        if fired_here {
            debug!(notifier = self.name, "notifier fired");
        }
        fired_here
    }

    /// Whether the notifier has fired. Never blocks.
    pub fn is_fired(&self) -> bool {
        self.release.is_cancelled()
    }

    /// Wait until the notifier fires or `cancel` is triggered.
    ///
    /// Returns `true` if the notifier fired, `false` if the wait was cancelled.
    /// When both have already happened the fired state wins. A cancelled wait
    /// leaves the notifier untouched.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            () = self.release.cancelled() => true,
            () = cancel.cancelled() => false,
        }
    }

    /// Wait for the notifier with no way to give up
    pub async fn fired(&self) {
        self.release.cancelled().await;
    }
}
