//! Session-wide keyed data.
//!
//! Values are tagged with their shape ([`ContextValue`]) so a reader can match
//! on what it expects instead of casting blindly. The context wraps the
//! well-known keys ([`WellKnownKey`]) in typed accessors; any other key is free
//! for plugins.
//!
//! Each key is independent: writes to one key are seen in order by readers of
//! that key, but there is no ordering between different keys.

use std::{any::Any, fmt, net::IpAddr, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use strum::{AsRefStr, EnumIter, IntoStaticStr};

use crate::identity::SessionIdentity;

/// Capability handle of the engine that owns the session
pub trait Engine: Send + Sync + fmt::Debug {
    /// Name of the engine, used in logs
    fn name(&self) -> &str;
}

/// Handle to the plugin manager of the session
pub trait PluginManager: Send + Sync + fmt::Debug {
    /// Names of the loaded plugins
    fn plugin_names(&self) -> Vec<String>;
}

/// Keys reserved by the session itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, EnumIter)]
pub enum WellKnownKey {
    /// Engine capability handle
    #[strum(serialize = "engine")]
    Engine,
    /// Session identity token
    #[strum(serialize = "SDKToken")]
    Token,
    /// Plugin manager handle
    #[strum(serialize = "plugins")]
    Plugins,
    /// Time the session started being built
    #[strum(serialize = "SDKTakeEffectTime")]
    TakeEffectTime,
    /// Time the session finished initialising
    #[strum(serialize = "SDKFinishInitTime")]
    FinishInitTime,
    /// IP address the client is bound to
    #[strum(serialize = "__sdk_bind_ip__")]
    BindIp,
}

impl WellKnownKey {
    /// The string key the value is stored under
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A value stored in the session store
#[derive(Debug, Clone)]
pub enum ContextValue {
    Text(String),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Ip(IpAddr),
    Identity(Arc<SessionIdentity>),
    Engine(Arc<dyn Engine>),
    Plugins(Arc<dyn PluginManager>),
    /// Anything else; read back with [`ContextValue::downcast`]
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    /// Wrap an arbitrary value
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub const fn as_ip(&self) -> Option<IpAddr> {
        match self {
            Self::Ip(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn as_identity(&self) -> Option<&Arc<SessionIdentity>> {
        match self {
            Self::Identity(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_engine(&self) -> Option<&Arc<dyn Engine>> {
        match self {
            Self::Engine(engine) => Some(engine),
            _ => None,
        }
    }

    pub fn as_plugins(&self) -> Option<&Arc<dyn PluginManager>> {
        match self {
            Self::Plugins(plugins) => Some(plugins),
            _ => None,
        }
    }

    /// Recover an opaque value of type `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Opaque(value) => Arc::clone(value).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<DateTime<Utc>> for ContextValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<IpAddr> for ContextValue {
    fn from(value: IpAddr) -> Self {
        Self::Ip(value)
    }
}

impl From<SessionIdentity> for ContextValue {
    fn from(value: SessionIdentity) -> Self {
        Self::Identity(Arc::new(value))
    }
}

/// Concurrent string-keyed map of [`ContextValue`]s
#[derive(Debug, Default)]
pub struct KeyedStore {
    entries: DashMap<String, ContextValue>,
}

impl KeyedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Value stored under `key`, if any
    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn set_known(&self, key: WellKnownKey, value: impl Into<ContextValue>) {
        self.set(key.as_str(), value);
    }

    pub fn get_known(&self, key: WellKnownKey) -> Option<ContextValue> {
        self.get(key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning the value it held
    pub fn remove(&self, key: &str) -> Option<ContextValue> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the keys currently present, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}
