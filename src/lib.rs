//! # myo-udp - gesture-triggered orientation streaming over UDP
//!
//! Bridges the pose/orientation event stream of a Myo armband to a remote
//! consumer. Making a fist starts streaming, releasing it stops:
//! - 1-byte control packets (`1` = start, `0` = stop)
//! - 3-byte orientation packets (pitch, roll, yaw quantized to a byte each)
//! - C FFI so a host that owns the vendor SDK can push events in
//!
//! ## Quick Start
//! ```no_run
//! use myo_udp::{Bridge, BridgeConfig, DeviceEvent, DeviceHandle, Gesture, NullDevice};
//! use myo_udp::{Orientation, UdpTransmitter};
//!
//! let config = BridgeConfig::from_env();
//! let tx = UdpTransmitter::new(config.remote, config.local_port);
//! let mut bridge = Bridge::new(config, NullDevice, tx);
//!
//! let handle = DeviceHandle(1);
//! bridge.handle_event(DeviceEvent::Connected { handle });
//! bridge.handle_event(DeviceEvent::PoseChanged { handle, gesture: Gesture::Fist });
//! bridge.handle_event(DeviceEvent::Orientation { handle, sample: Orientation::new(0.1, 0.0, -0.2) });
//! bridge.handle_event(DeviceEvent::PoseChanged { handle, gesture: Gesture::Rest });
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod protocol;
pub mod transport;
pub mod device;
pub mod activation;
pub mod bridge;
pub mod pump;
pub mod ffi;

pub use error::BridgeError;
pub use types::*;
pub use config::BridgeConfig;
pub use protocol::Packet;
pub use transport::{Transmitter, UdpTransmitter};
pub use device::{DeviceControl, DeviceEvent, NullDevice};
pub use activation::ActivationMachine;
pub use bridge::Bridge;
pub use pump::{EventPump, EventSender};

/// Result type alias for myo-udp operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
