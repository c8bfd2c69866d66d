//! Location discovery driver
//!
//! [`LocationUpdater`] is the single writer of a context's location: it asks a
//! [`LocationResolver`] and records every answer, success or failure, with
//! [`SessionContext::set_current_location`]. It owns no task of its own;
//! callers run it on whatever task they choose.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::LocationConfig, context::SessionContext, error::LocationError, location::Location,
    resolver::LocationResolver, Result,
};

/// How a [`LocationUpdater::run`] loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The location is Ready
    Ready {
        /// Attempts made by this run
        attempts: u32,
    },
    /// Every attempt finished without reaching Ready
    Exhausted { attempts: u32 },
    /// The cancellation token fired first
    Cancelled { attempts: u32 },
}

impl UpdateOutcome {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub const fn attempts(self) -> u32 {
        match self {
            Self::Ready { attempts }
            | Self::Exhausted { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }
}

/// Feeds resolver answers into a session context
#[derive(Debug, Clone)]
pub struct LocationUpdater {
    context: Arc<SessionContext>,
    resolver: Arc<dyn LocationResolver>,
    client_ip: String,
    retry_interval: Duration,
    max_attempts: u32,
}

impl LocationUpdater {
    /// Create an updater with one second between attempts and three attempts
    pub fn new(
        context: Arc<SessionContext>,
        resolver: Arc<dyn LocationResolver>,
        client_ip: impl Into<String>,
    ) -> Self {
        Self {
            context,
            resolver,
            client_ip: client_ip.into(),
            retry_interval: Duration::from_secs(1),
            max_attempts: 3,
        }
    }

    /// Create an updater using the retry settings of `config`
    pub fn from_config(
        context: Arc<SessionContext>,
        resolver: Arc<dyn LocationResolver>,
        client_ip: impl Into<String>,
        config: &LocationConfig,
    ) -> Self {
        Self::new(context, resolver, client_ip)
            .with_retry_interval(config.retry_interval())
            .with_max_attempts(config.max_attempts)
    }

    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// At least one attempt is always made
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Make one discovery attempt and record its result.
    ///
    /// Returns `true` if this attempt made the location Ready.
    pub async fn run_once(&self) -> bool {
        let result = self.resolver.fetch(&self.client_ip).await;
        self.record(result)
    }

    /// Attempt discovery until the location is Ready, the attempts run out,
    /// or `cancel` fires.
    ///
    /// A context that is already Ready returns immediately without asking the
    /// resolver. Cancellation during a request drops that request unrecorded.
    pub async fn run(&self, cancel: &CancellationToken) -> UpdateOutcome {
        if self.context.is_location_ready() {
            return UpdateOutcome::Ready { attempts: 0 };
        }

        for attempt in 1..=self.max_attempts {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return UpdateOutcome::Cancelled { attempts: attempt - 1 };
                }
                result = self.resolver.fetch(&self.client_ip) => result,
            };
            self.record(result);

            if self.context.is_location_ready() {
                return UpdateOutcome::Ready { attempts: attempt };
            }
            if attempt == self.max_attempts {
                break;
            }

            debug!(
                attempt,
                retry_in = ?self.retry_interval,
                "location not ready, retrying"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return UpdateOutcome::Cancelled { attempts: attempt };
                }
                () = tokio::time::sleep(self.retry_interval) => {}
            }
        }

        warn!(
            resolver = self.resolver.name(),
            attempts = self.max_attempts,
            status = %self.context.current_location().status(),
            "location discovery gave up"
        );
        UpdateOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }

    fn record(&self, result: Result<Location>) -> bool {
        match result {
            Ok(location) => {
                let became_ready = self.context.set_current_location(Some(location.clone()), None);
                if became_ready {
                    info!(
                        resolver = self.resolver.name(),
                        %location,
                        "location discovered"
                    );
                } else if location.is_empty() {
                    debug!(resolver = self.resolver.name(), "resolver has no location for client");
                }
                became_ready
            }
            Err(err) => {
                warn!(
                    resolver = self.resolver.name(),
                    client_ip = %self.client_ip,
                    error = %err,
                    "location lookup failed"
                );
                self.context
                    .set_current_location(None, Some(LocationError::from(err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{location::LocationStatus, Error};

    /// Resolver replaying a fixed script of answers, then repeating the last
    #[derive(Debug)]
    struct ScriptedResolver {
        script: Mutex<VecDeque<Result<Location>>>,
        calls: AtomicU32,
    }

    impl ScriptedResolver {
        fn new(script: Vec<Result<Location>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocationResolver for ScriptedResolver {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, _client_ip: &str) -> Result<Location> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn unavailable() -> Error {
        Error::Transport("connection refused".into())
    }

    #[tokio::test]
    async fn test_run_once_records_failure_as_data() {
        let ctx = Arc::new(SessionContext::new());
        let resolver = ScriptedResolver::new(vec![Err(unavailable())]);
        let updater = LocationUpdater::new(Arc::clone(&ctx), resolver, "10.0.0.1");

        assert!(!updater.run_once().await);
        let snap = ctx.current_location();
        assert_eq!(snap.status(), LocationStatus::Error);
        assert_eq!(snap.last_error().map(|e| e.code.as_str()), Some("TRANSPORT_ERROR"));
    }

    #[tokio::test]
    async fn test_run_retries_until_ready() {
        let ctx = Arc::new(SessionContext::new());
        let resolver = ScriptedResolver::new(vec![
            Err(unavailable()),
            Ok(Location::default()),
            Ok(Location::region("gz")),
        ]);
        let updater = LocationUpdater::new(Arc::clone(&ctx), resolver.clone(), "10.0.0.1")
            .with_retry_interval(Duration::from_millis(5))
            .with_max_attempts(5);

        let outcome = updater.run(&CancellationToken::new()).await;
        assert_eq!(outcome, UpdateOutcome::Ready { attempts: 3 });
        assert_eq!(resolver.calls(), 3);
        assert!(ctx.is_location_ready());
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let ctx = Arc::new(SessionContext::new());
        let resolver = ScriptedResolver::new(vec![Ok(Location::default())]);
        let updater = LocationUpdater::new(Arc::clone(&ctx), resolver.clone(), "10.0.0.1")
            .with_retry_interval(Duration::from_millis(1))
            .with_max_attempts(2);

        let outcome = updater.run(&CancellationToken::new()).await;
        assert_eq!(outcome, UpdateOutcome::Exhausted { attempts: 2 });
        assert_eq!(resolver.calls(), 2);
        assert_eq!(ctx.current_location().status(), LocationStatus::Empty);
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let ctx = Arc::new(SessionContext::new());
        let resolver = ScriptedResolver::new(vec![Err(unavailable())]);
        let updater = LocationUpdater::new(Arc::clone(&ctx), resolver, "10.0.0.1")
            .with_retry_interval(Duration::from_secs(60))
            .with_max_attempts(10);

        let cancel = CancellationToken::new();
        let run = {
            let updater = updater.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { updater.run(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let outcome = run.await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Cancelled { attempts: 1 });
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test]
    async fn test_run_on_ready_context_skips_resolver() {
        let ctx = Arc::new(SessionContext::new());
        ctx.set_current_location(Some(Location::region("gz")), None);
        let resolver = ScriptedResolver::new(vec![Err(unavailable())]);
        let updater = LocationUpdater::new(Arc::clone(&ctx), resolver.clone(), "10.0.0.1");

        let outcome = updater.run(&CancellationToken::new()).await;
        assert!(outcome.is_ready());
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_from_config_clamps_attempts() {
        let ctx = Arc::new(SessionContext::new());
        let resolver = ScriptedResolver::new(vec![Ok(Location::default())]);
        let config = LocationConfig {
            max_attempts: 0,
            retry_interval_ms: 1,
            ..LocationConfig::default()
        };
        let updater = LocationUpdater::from_config(ctx, resolver.clone(), "", &config);

        let outcome = updater.run(&CancellationToken::new()).await;
        assert_eq!(outcome, UpdateOutcome::Exhausted { attempts: 1 });
        assert_eq!(resolver.calls(), 1);
    }
}
