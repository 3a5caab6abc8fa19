use crate::types::{Gesture, PayloadMode, RetriggerPolicy};
use crate::{BridgeError, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

// -- Defaults of the deployed receiver --
pub const DEFAULT_REMOTE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 107);
pub const DEFAULT_REMOTE_PORT: u16 = 57701;
pub const DEFAULT_LOCAL_PORT: u16 = 11696;

// -- Environment overrides --
pub const ENV_REMOTE: &str = "MYO_UDP_REMOTE";
pub const ENV_LOCAL_PORT: &str = "MYO_UDP_LOCAL_PORT";
pub const ENV_TRIGGER: &str = "MYO_UDP_TRIGGER";
pub const ENV_RETRIGGER: &str = "MYO_UDP_RETRIGGER";
pub const ENV_PAYLOAD: &str = "MYO_UDP_PAYLOAD";

/// Startup configuration. Nothing here changes while the bridge runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Destination of every packet.
    pub remote: SocketAddr,
    /// Local port each transient socket binds to. 0 lets the OS pick.
    pub local_port: u16,
    /// Gesture that starts streaming. Any other gesture stops it.
    pub trigger: Gesture,
    pub retrigger: RetriggerPolicy,
    pub payload: PayloadMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            remote: SocketAddr::new(IpAddr::V4(DEFAULT_REMOTE_IP), DEFAULT_REMOTE_PORT),
            local_port: DEFAULT_LOCAL_PORT,
            trigger: Gesture::Fist,
            retrigger: RetriggerPolicy::default(),
            payload: PayloadMode::default(),
        }
    }
}

impl BridgeConfig {
    pub fn new(remote: SocketAddr, local_port: u16) -> Self {
        Self {
            remote,
            local_port,
            ..Self::default()
        }
    }

    pub fn with_trigger(mut self, trigger: Gesture) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_retrigger(mut self, retrigger: RetriggerPolicy) -> Self {
        self.retrigger = retrigger;
        self
    }

    pub fn with_payload(mut self, payload: PayloadMode) -> Self {
        self.payload = payload;
        self
    }

    /// Build a config from `MYO_UDP_*` environment variables.
    ///
    /// Unset variables keep their default. Unparsable values are logged and
    /// also fall back to the default, so a typo never stops the bridge.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let remote = match read_string(&lookup, ENV_REMOTE) {
            Some(v) => parse_remote(&v).unwrap_or_else(|e| {
                log::warn!("{}: {}, using {}", ENV_REMOTE, e, defaults.remote);
                defaults.remote
            }),
            None => defaults.remote,
        };

        let local_port = read_u16(&lookup, ENV_LOCAL_PORT, defaults.local_port);

        let trigger = match read_string(&lookup, ENV_TRIGGER) {
            Some(v) => Gesture::from_name(&v).unwrap_or_else(|| {
                log::warn!("Unknown {}='{}', using {}", ENV_TRIGGER, v, defaults.trigger);
                defaults.trigger
            }),
            None => defaults.trigger,
        };

        let retrigger = match read_string(&lookup, ENV_RETRIGGER).as_deref() {
            Some("ignore") => RetriggerPolicy::Ignore,
            Some("restart") => RetriggerPolicy::Restart,
            Some(other) => {
                log::warn!(
                    "Unknown {}='{}', using ignore (supported: ignore|restart)",
                    ENV_RETRIGGER,
                    other
                );
                defaults.retrigger
            }
            None => defaults.retrigger,
        };

        let payload = match read_string(&lookup, ENV_PAYLOAD).as_deref() {
            Some("absolute") => PayloadMode::Absolute,
            Some("delta") => PayloadMode::Delta,
            Some(other) => {
                log::warn!(
                    "Unknown {}='{}', using absolute (supported: absolute|delta)",
                    ENV_PAYLOAD,
                    other
                );
                defaults.payload
            }
            None => defaults.payload,
        };

        Self {
            remote,
            local_port,
            trigger,
            retrigger,
            payload,
        }
    }
}

/// Resolve `host:port` into a socket address. Literal IPs are taken as is,
/// anything else goes through the system resolver.
pub fn parse_remote(value: &str) -> Result<SocketAddr> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .to_socket_addrs()
        .map_err(|e| BridgeError::Config(format!("cannot resolve '{}': {}", value, e)))?
        .next()
        .ok_or_else(|| BridgeError::Config(format!("'{}' resolved to no address", value)))
}

/// Resolve a host name or IP literal with a separate port.
pub fn resolve_remote(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| BridgeError::Config(format!("cannot resolve '{}': {}", host, e)))?
        .next()
        .ok_or_else(|| BridgeError::Config(format!("'{}' resolved to no address", host)))
}

fn read_string<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn read_u16<F>(lookup: &F, name: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    match read_string(lookup, name) {
        Some(v) => v.parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid {}='{}', using {}", name, v, default);
            default
        }),
        None => default,
    }
}
