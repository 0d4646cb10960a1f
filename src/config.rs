//! Listener and coordinator configuration.
//!
//! Both structs have sensible defaults and fluent setters:
//!
//! ```
//! use std::time::Duration;
//! use ramwire::{CoordinatorConfig, ListenerConfig, PayloadFormat};
//!
//! let config = CoordinatorConfig::default()
//!     .listener(
//!         ListenerConfig::default()
//!             .bind_addr(([127, 0, 0, 1], 0).into())
//!             .payload_format(PayloadFormat::MsgPack),
//!     )
//!     .reap_interval(Duration::from_secs(5));
//! assert_eq!(config.reap_interval, Duration::from_secs(5));
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::codec::PayloadFormat;
use crate::error::{RamwireError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Port the emulator-side client connects to by default.
pub const DEFAULT_SOCKET_PORT: u16 = 8765;

/// Default size of the per-connection read buffer (64 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default bound on concurrently running frame handlers.
pub const DEFAULT_MAX_IN_FLIGHT_HANDLERS: usize = 256;

/// Default period between reaper sweeps.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(10);

/// Environment variable overriding the bind host.
pub const ENV_SOCKET_HOST: &str = "RAMWIRE_SOCKET_HOST";

/// Environment variable overriding the bind port.
pub const ENV_SOCKET_PORT: &str = "RAMWIRE_SOCKET_PORT";

/// Environment variable selecting the payload format (`json` or `msgpack`).
pub const ENV_PAYLOAD_FORMAT: &str = "RAMWIRE_PAYLOAD_FORMAT";

/// Configuration for a [`FrameListener`](crate::FrameListener).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Address to bind. Port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Encoding of frame payloads on the wire.
    pub payload_format: PayloadFormat,
    /// Largest accepted payload; a larger length prefix closes the connection.
    pub max_payload_size: u64,
    /// Bytes requested per socket read.
    pub read_buffer_size: usize,
    /// Maximum handler tasks running at once. `None` means unbounded.
    ///
    /// When the limit is reached, reader loops wait for a slot before
    /// dispatching the next frame.
    pub max_in_flight_handlers: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_SOCKET_PORT),
            payload_format: PayloadFormat::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_in_flight_handlers: Some(DEFAULT_MAX_IN_FLIGHT_HANDLERS),
        }
    }
}

impl ListenerConfig {
    /// Build a config from the defaults plus any `RAMWIRE_*` environment
    /// overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_SOCKET_HOST) {
            let ip: IpAddr = host.trim().parse().map_err(|e| {
                RamwireError::Config(format!("{}={:?}: {}", ENV_SOCKET_HOST, host, e))
            })?;
            config.bind_addr.set_ip(ip);
        }

        if let Some(port) = lookup(ENV_SOCKET_PORT) {
            let port: u16 = port.trim().parse().map_err(|e| {
                RamwireError::Config(format!("{}={:?}: {}", ENV_SOCKET_PORT, port, e))
            })?;
            config.bind_addr.set_port(port);
        }

        if let Some(format) = lookup(ENV_PAYLOAD_FORMAT) {
            config.payload_format = format.trim().parse()?;
        }

        Ok(config)
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the payload format.
    pub fn payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }

    /// Set the maximum payload size in bytes.
    pub fn max_payload_size(mut self, max: u64) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Set the socket read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Bound concurrently running handlers, or `None` for no bound.
    ///
    /// A bound of zero is treated as one.
    pub fn max_in_flight_handlers(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight_handlers = limit.map(|n| n.max(1));
        self
    }
}

/// Configuration for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Listener settings.
    pub listener: ListenerConfig,
    /// Period between sweeps that collect finished handler tasks.
    pub reap_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl CoordinatorConfig {
    /// Set the listener config.
    pub fn listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    /// Set the reap interval. Zero is rounded up to one millisecond.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval.max(Duration::from_millis(1));
        self
    }
}
