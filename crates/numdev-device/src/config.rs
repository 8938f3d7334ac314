//! Device runtime configuration.

use std::error::Error;
use std::fmt;

/// Environment variable overriding [`DeviceConfig::capacity_bytes`].
pub const ENV_CAPACITY: &str = "NUMDEV_DEVICE_CAPACITY";

/// Environment variable overriding [`DeviceConfig::stream_queue_depth`].
pub const ENV_QUEUE_DEPTH: &str = "NUMDEV_STREAM_QUEUE_DEPTH";

/// Configuration for a [`Device`](crate::Device).
///
/// Validated when the device is created; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Total bytes the device heap may hand out. Default: 1 GiB.
    pub capacity_bytes: usize,
    /// Maximum number of operations queued on one stream before
    /// enqueueing blocks the caller. Default: 1024.
    pub stream_queue_depth: usize,
}

impl DeviceConfig {
    /// Default device capacity: 1 GiB.
    pub const DEFAULT_CAPACITY_BYTES: usize = 1 << 30;

    /// Default per-stream queue depth.
    pub const DEFAULT_STREAM_QUEUE_DEPTH: usize = 1024;

    /// A config with the given capacity and the default queue depth.
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            ..Self::default()
        }
    }

    /// Defaults overridden by `NUMDEV_DEVICE_CAPACITY` and
    /// `NUMDEV_STREAM_QUEUE_DEPTH` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_CAPACITY) {
            config.capacity_bytes = parse_env(ENV_CAPACITY, &v)?;
        }
        if let Some(v) = lookup(ENV_QUEUE_DEPTH) {
            config.stream_queue_depth = parse_env(ENV_QUEUE_DEPTH, &v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.stream_queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: Self::DEFAULT_CAPACITY_BYTES,
            stream_queue_depth: Self::DEFAULT_STREAM_QUEUE_DEPTH,
        }
    }
}

fn parse_env(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        })
}

/// Errors detected while building or installing a [`DeviceConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `capacity_bytes` is zero.
    ZeroCapacity,
    /// `stream_queue_depth` is zero.
    ZeroQueueDepth,
    /// An environment override is not a non-negative integer.
    InvalidEnv {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The primary device was already created.
    AlreadyInitialized,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "device capacity must be at least 1 byte"),
            Self::ZeroQueueDepth => write!(f, "stream queue depth must be at least 1"),
            Self::InvalidEnv { var, value } => {
                write!(f, "{var}={value:?} is not a valid byte count")
            }
            Self::AlreadyInitialized => write!(f, "primary device already initialized"),
        }
    }
}

impl Error for ConfigError {}
