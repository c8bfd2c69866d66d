//! Session context
//!
//! The single object shared by everything running in a client session. It
//! tracks where the client is ([`LocationCell`]), tells waiters when that
//! becomes known (two [`BroadcastOnce`] notifiers), carries keyed session data
//! ([`KeyedStore`]) and supplies the time ([`Clock`]).
//!
//! # Notifiers
//!
//! - `initialized` fires on the first [`SessionContext::set_current_location`]
//!   call, whatever its outcome.
//! - `ready` fires on the first call that moves the location to Ready.
//!
//! Only waits suspend. Every other method returns without blocking.

use std::{net::IpAddr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    cell::LocationCell,
    clock::{Clock, SystemClock},
    error::LocationError,
    identity::SessionIdentity,
    location::{Location, LocationSnapshot, LocationStatus},
    notifier::BroadcastOnce,
    store::{ContextValue, Engine, KeyedStore, PluginManager, WellKnownKey},
};

/// Shared coordination context of a client session
#[derive(Debug)]
pub struct SessionContext {
    clock: Arc<dyn Clock>,
    location: LocationCell,
    initialized: BroadcastOnce,
    ready: BroadcastOnce,
    store: KeyedStore,
}

impl SessionContext {
    /// Create a context using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a context reading time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            location: LocationCell::new(),
            initialized: BroadcastOnce::new("location-initialized"),
            ready: BroadcastOnce::new("location-ready"),
            store: KeyedStore::new(),
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Location
    // ───────────────────────────────────────────────────────────────────────

    /// Current location snapshot. Never blocks.
    pub fn current_location(&self) -> Arc<LocationSnapshot> {
        self.location.current()
    }

    pub fn is_location_ready(&self) -> bool {
        self.location.status() == LocationStatus::Ready
    }

    /// Record the result of one discovery attempt.
    ///
    /// Returns `true` only when this call moved the location from a non-ready
    /// status to Ready. Once Ready, only Ready results are accepted; anything
    /// else is dropped silently.
    ///
    /// Intended for a single writer, the location resolver.
    pub fn set_current_location(
        &self,
        location: Option<Location>,
        err: Option<LocationError>,
    ) -> bool {
        let transition = self.location.propose(location, err);
        self.initialized.signal();
        if transition.became_ready {
            self.ready.signal();
        }
        transition.became_ready
    }

    /// Wait until the location reaches `target`.
    ///
    /// - `Init`: waits for the first discovery attempt and returns `true`.
    ///   `cancel` is not consulted.
    /// - `Error`: waits for the first discovery attempt, then reports whether
    ///   the status is Error at that moment. A later update landing between the
    ///   wakeup and the read can change the answer. `cancel` is not consulted.
    /// - `Ready`: `true` once the location is Ready, `false` if `cancel` fires
    ///   first.
    /// - `Empty`: `false` immediately.
    pub async fn wait_location_info(
        &self,
        cancel: &CancellationToken,
        target: LocationStatus,
    ) -> bool {
        match target {
            LocationStatus::Init => {
                self.initialized.fired().await;
                true
            }
            LocationStatus::Error => {
                self.initialized.fired().await;
                self.location.status() == LocationStatus::Error
            }
            LocationStatus::Ready => self.ready.wait(cancel).await,
            LocationStatus::Empty => false,
        }
    }

    /// Wait at most `timeout` for the location to become Ready
    pub async fn wait_ready_for(&self, timeout: Duration) -> bool {
        let never = CancellationToken::new();
        let ready = tokio::time::timeout(
            timeout,
            self.wait_location_info(&never, LocationStatus::Ready),
        )
        .await
        .unwrap_or(false);
        if !ready {
            debug!(?timeout, "location not ready before deadline");
        }
        ready
    }

    // ───────────────────────────────────────────────────────────────────────
    // Keyed data
    // ───────────────────────────────────────────────────────────────────────

    /// Store a value under `key`
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.store.set(key, value);
    }

    /// Value stored under `key`, if any
    pub fn get_value(&self, key: &str) -> Option<ContextValue> {
        self.store.get(key)
    }

    pub const fn store(&self) -> &KeyedStore {
        &self.store
    }

    pub fn set_identity(&self, identity: SessionIdentity) {
        self.store.set_known(WellKnownKey::Token, identity);
    }

    pub fn identity(&self) -> Option<Arc<SessionIdentity>> {
        self.store
            .get_known(WellKnownKey::Token)
            .and_then(|value| value.as_identity().cloned())
    }

    /// Session uid, or `""` while no identity is stored
    pub fn client_id(&self) -> String {
        self.identity()
            .map(|identity| identity.uid.clone())
            .unwrap_or_default()
    }

    pub fn set_engine(&self, engine: Arc<dyn Engine>) {
        self.store
            .set_known(WellKnownKey::Engine, ContextValue::Engine(engine));
    }

    /// Engine handle, or `None` while not yet registered
    pub fn engine(&self) -> Option<Arc<dyn Engine>> {
        self.store
            .get_known(WellKnownKey::Engine)
            .and_then(|value| value.as_engine().cloned())
    }

    pub fn set_plugins(&self, plugins: Arc<dyn PluginManager>) {
        self.store
            .set_known(WellKnownKey::Plugins, ContextValue::Plugins(plugins));
    }

    pub fn plugins(&self) -> Option<Arc<dyn PluginManager>> {
        self.store
            .get_known(WellKnownKey::Plugins)
            .and_then(|value| value.as_plugins().cloned())
    }

    /// Stamp the time the session started being built
    pub fn mark_take_effect(&self) -> DateTime<Utc> {
        let now = self.now();
        self.store.set_known(WellKnownKey::TakeEffectTime, now);
        now
    }

    pub fn take_effect_time(&self) -> Option<DateTime<Utc>> {
        self.store
            .get_known(WellKnownKey::TakeEffectTime)
            .and_then(|value| value.as_timestamp())
    }

    /// Stamp the time the session finished initialising
    pub fn mark_finish_init(&self) -> DateTime<Utc> {
        let now = self.now();
        self.store.set_known(WellKnownKey::FinishInitTime, now);
        now
    }

    pub fn finish_init_time(&self) -> Option<DateTime<Utc>> {
        self.store
            .get_known(WellKnownKey::FinishInitTime)
            .and_then(|value| value.as_timestamp())
    }

    pub fn set_bind_ip(&self, ip: IpAddr) {
        self.store.set_known(WellKnownKey::BindIp, ip);
    }

    pub fn bind_ip(&self) -> Option<IpAddr> {
        self.store
            .get_known(WellKnownKey::BindIp)
            .and_then(|value| value.as_ip())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Time
    // ───────────────────────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Time elapsed since `start` according to the context clock
    pub fn since(&self, start: DateTime<Utc>) -> chrono::Duration {
        self.clock.since(start)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::clock::ManualClock;

    #[derive(Debug)]
    struct TestEngine;

    impl Engine for TestEngine {
        fn name(&self) -> &str {
            "test-engine"
        }
    }

    #[derive(Debug)]
    struct TestPlugins;

    impl PluginManager for TestPlugins {
        fn plugin_names(&self) -> Vec<String> {
            vec!["location".into()]
        }
    }

    #[tokio::test]
    async fn test_fresh_context_times_out_waiting_for_ready() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.current_location().status(), LocationStatus::Init);

        let started = Instant::now();
        assert!(!ctx.wait_ready_for(Duration::from_millis(50)).await);
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_publish_ready_location() {
        let ctx = SessionContext::new();
        assert!(ctx.set_current_location(Some(Location::region("gz")), None));

        let snap = ctx.current_location();
        assert_eq!(snap.status(), LocationStatus::Ready);
        assert_eq!(snap.location().map(|l| l.region.as_str()), Some("gz"));
        assert!(ctx.is_location_ready());

        let cancel = CancellationToken::new();
        assert!(ctx.wait_location_info(&cancel, LocationStatus::Ready).await);
        assert!(ctx.wait_location_info(&cancel, LocationStatus::Init).await);
        assert!(!ctx.wait_location_info(&cancel, LocationStatus::Error).await);
    }

    #[tokio::test]
    async fn test_error_then_ready_does_not_signal_early() {
        let ctx = SessionContext::new();
        let err = LocationError::new("RESOLVER_FAILED", "connection refused");

        assert!(!ctx.set_current_location(None, Some(err)));
        assert!(!ctx.ready.is_fired());
        assert!(ctx.initialized.is_fired());

        let cancel = CancellationToken::new();
        assert!(ctx.wait_location_info(&cancel, LocationStatus::Error).await);

        assert!(ctx.set_current_location(Some(Location::region("sh")), None));
        let snap = ctx.current_location();
        assert!(snap.is_ready());
        assert_eq!(snap.location().map(|l| l.region.as_str()), Some("sh"));
    }

    #[tokio::test]
    async fn test_empty_after_ready_is_rejected() {
        let ctx = SessionContext::new();
        assert!(ctx.set_current_location(Some(Location::region("gz")), None));
        let before = ctx.current_location();

        assert!(!ctx.set_current_location(Some(Location::default()), None));
        assert!(!ctx.set_current_location(None, Some(LocationError::new("X", "late failure"))));
        assert_eq!(*ctx.current_location(), *before);
    }

    #[tokio::test]
    async fn test_empty_target_returns_false() {
        let ctx = SessionContext::new();
        ctx.set_current_location(Some(Location::default()), None);
        let cancel = CancellationToken::new();
        assert!(!ctx.wait_location_info(&cancel, LocationStatus::Empty).await);
    }

    #[tokio::test]
    async fn test_cancelled_ready_wait_returns_false() {
        let ctx = SessionContext::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!ctx.wait_location_info(&cancel, LocationStatus::Ready).await);
    }

    #[test]
    fn test_set_and_get_value() {
        let ctx = SessionContext::new();
        ctx.set_value("k", "v");
        assert_eq!(
            ctx.get_value("k").as_ref().and_then(ContextValue::as_text),
            Some("v")
        );
        assert!(ctx.get_value("missing").is_none());
    }

    #[test]
    fn test_typed_accessors_fail_soft() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.client_id(), "");
        assert!(ctx.engine().is_none());
        assert!(ctx.plugins().is_none());

        ctx.set_value(WellKnownKey::Token.as_str(), "not-an-identity");
        ctx.set_value(WellKnownKey::Engine.as_str(), 42_u32.to_string());
        assert_eq!(ctx.client_id(), "");
        assert!(ctx.engine().is_none());
    }

    #[test]
    fn test_typed_accessors_round_trip() {
        let ctx = SessionContext::new();
        let identity = SessionIdentity::detect("locus", "0.1.0", "10.1.2.3");
        let uid = identity.uid.clone();

        ctx.set_identity(identity);
        ctx.set_engine(Arc::new(TestEngine));
        ctx.set_plugins(Arc::new(TestPlugins));
        ctx.set_bind_ip("10.1.2.3".parse().unwrap());

        assert_eq!(ctx.client_id(), uid);
        assert_eq!(ctx.engine().map(|e| e.name().to_string()).as_deref(), Some("test-engine"));
        assert_eq!(ctx.plugins().map(|p| p.plugin_names()), Some(vec!["location".to_string()]));
        assert_eq!(ctx.bind_ip(), Some("10.1.2.3".parse().unwrap()));
        assert!(ctx.get_value("SDKToken").is_some());
    }

    #[test]
    fn test_clock_injection() {
        let clock = Arc::new(ManualClock::at_epoch());
        let ctx = SessionContext::with_clock(clock.clone());

        let started = ctx.mark_take_effect();
        clock.advance(Duration::from_secs(2));
        let finished = ctx.mark_finish_init();

        assert_eq!(ctx.take_effect_time(), Some(started));
        assert_eq!(ctx.finish_init_time(), Some(finished));
        assert_eq!(ctx.since(started), chrono::Duration::seconds(2));
    }
}
