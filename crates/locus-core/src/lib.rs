//! Locus-core - Session coordination context for a service-discovery client
//!
//! This crate provides:
//! - Location snapshot and its monotonic readiness state machine
//! - One-shot broadcast notifiers with cancellable waits
//! - Concurrent keyed session data with typed accessors
//! - Injectable clock
//! - Location resolvers and the discovery driver that feeds the context
//! - Configuration loading
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` / `expect()` / `panic!()` outside tests
//! - No `unsafe`

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod location;
pub mod notifier;
pub mod resolver;
pub mod store;
pub mod updater;

pub use cell::{LocationCell, Transition};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LocationConfig, LocusConfig, ProviderKind};
pub use context::SessionContext;
pub use error::{Error, LocationError, Result};
pub use identity::SessionIdentity;
pub use location::{Location, LocationSnapshot, LocationStatus};
pub use notifier::BroadcastOnce;
pub use resolver::{
    resolver_from_config, HttpResolver, LocationRequest, LocationResolver, LocationResponse,
    StaticResolver,
};
pub use store::{ContextValue, Engine, KeyedStore, PluginManager, WellKnownKey};
pub use updater::{LocationUpdater, UpdateOutcome};

/// Re-exported so callers can build the tokens the context waits on
pub use tokio_util::sync::CancellationToken;
