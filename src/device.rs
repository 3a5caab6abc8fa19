//! Interface to the armband SDK.
//!
//! The SDK itself (pairing, hub, event delivery) lives outside this crate.
//! Its notifications come in as [`DeviceEvent`] values and commands go back
//! out through [`DeviceControl`].

use crate::types::{DeviceHandle, Gesture, Orientation, Subscriptions, UnlockMode, Vibration};
use crate::Result;

/// A notification delivered by the device SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Connected { handle: DeviceHandle },
    Disconnected { handle: DeviceHandle },
    PoseChanged { handle: DeviceHandle, gesture: Gesture },
    Orientation { handle: DeviceHandle, sample: Orientation },
    Locked { handle: DeviceHandle },
    Unlocked { handle: DeviceHandle },
    /// The SDK reported a failure for this device.
    Error { handle: DeviceHandle, message: String },
}

impl DeviceEvent {
    pub fn handle(&self) -> DeviceHandle {
        match self {
            DeviceEvent::Connected { handle }
            | DeviceEvent::Disconnected { handle }
            | DeviceEvent::PoseChanged { handle, .. }
            | DeviceEvent::Orientation { handle, .. }
            | DeviceEvent::Locked { handle }
            | DeviceEvent::Unlocked { handle }
            | DeviceEvent::Error { handle, .. } => *handle,
        }
    }
}

/// Commands the bridge sends back to the device SDK.
///
/// Errors are reported as [`crate::BridgeError::Device`].
pub trait DeviceControl {
    /// Request a haptic pulse.
    fn vibrate(&self, handle: DeviceHandle, kind: Vibration) -> Result<()>;

    /// Request an unlock mode so poses keep arriving.
    fn unlock(&self, handle: DeviceHandle, mode: UnlockMode) -> Result<()>;

    /// Replace the set of notification kinds delivered for `handle`.
    fn set_subscriptions(&self, handle: DeviceHandle, subs: Subscriptions) -> Result<()>;
}

impl<T: DeviceControl + ?Sized> DeviceControl for &T {
    fn vibrate(&self, handle: DeviceHandle, kind: Vibration) -> Result<()> {
        (**self).vibrate(handle, kind)
    }

    fn unlock(&self, handle: DeviceHandle, mode: UnlockMode) -> Result<()> {
        (**self).unlock(handle, mode)
    }

    fn set_subscriptions(&self, handle: DeviceHandle, subs: Subscriptions) -> Result<()> {
        (**self).set_subscriptions(handle, subs)
    }
}

impl<T: DeviceControl + ?Sized> DeviceControl for Box<T> {
    fn vibrate(&self, handle: DeviceHandle, kind: Vibration) -> Result<()> {
        (**self).vibrate(handle, kind)
    }

    fn unlock(&self, handle: DeviceHandle, mode: UnlockMode) -> Result<()> {
        (**self).unlock(handle, mode)
    }

    fn set_subscriptions(&self, handle: DeviceHandle, subs: Subscriptions) -> Result<()> {
        (**self).set_subscriptions(handle, subs)
    }
}

/// Accepts every command and does nothing.
///
/// For hosts that deliver every notification regardless of subscriptions
/// and have no haptics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDevice;

impl DeviceControl for NullDevice {
    fn vibrate(&self, handle: DeviceHandle, kind: Vibration) -> Result<()> {
        log::debug!("Device {}: vibrate {:?} (ignored)", handle, kind);
        Ok(())
    }

    fn unlock(&self, _handle: DeviceHandle, _mode: UnlockMode) -> Result<()> {
        Ok(())
    }

    fn set_subscriptions(&self, _handle: DeviceHandle, _subs: Subscriptions) -> Result<()> {
        Ok(())
    }
}
