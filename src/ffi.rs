//! C FFI layer for myo-udp.
//!
//! For hosts that own the armband SDK: they forward SDK callbacks into the
//! bridge with the `mu_push_*` functions and receive device commands back
//! through [`MuDeviceCallbacks`].
//! The generated C header is written to `include/myo_udp.h` by cbindgen.

use crate::bridge::Bridge;
use crate::config::{self, BridgeConfig};
use crate::device::{DeviceControl, DeviceEvent, NullDevice};
use crate::error::LastError;
use crate::pump::EventPump;
use crate::transport::UdpTransmitter;
use crate::types::{DeviceHandle, Gesture, Orientation, Subscriptions, UnlockMode, Vibration};
use crate::{BridgeError, Result};
use std::ffi::{c_char, c_int, c_void, CStr};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque bridge handle for C consumers.
pub struct MuBridge(EventPump);

pub type MuVibrateFn =
    unsafe extern "C" fn(user_data: *mut c_void, handle: u64, kind: Vibration) -> c_int;
pub type MuUnlockFn =
    unsafe extern "C" fn(user_data: *mut c_void, handle: u64, mode: UnlockMode) -> c_int;
/// `subscriptions` is a bitmask: 1 = pose, 2 = orientation, 4 = lock.
pub type MuSubscribeFn =
    unsafe extern "C" fn(user_data: *mut c_void, handle: u64, subscriptions: u32) -> c_int;

/// Device command callbacks supplied by the host.
///
/// Every callback returns 0 on success. A missing callback counts as success.
/// Callbacks run on the bridge thread, not on the thread that pushed events.
#[repr(C)]
pub struct MuDeviceCallbacks {
    /// Passed back unchanged as the first argument of every callback.
    pub user_data: *mut c_void,
    pub vibrate: Option<MuVibrateFn>,
    pub unlock: Option<MuUnlockFn>,
    pub set_subscriptions: Option<MuSubscribeFn>,
}

struct CallbackDevice {
    user_data: *mut c_void,
    vibrate: Option<MuVibrateFn>,
    unlock: Option<MuUnlockFn>,
    set_subscriptions: Option<MuSubscribeFn>,
}

// The host promises `user_data` may be used from the bridge thread.
unsafe impl Send for CallbackDevice {}

fn check(what: &str, handle: DeviceHandle, rc: c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(BridgeError::Device(format!(
            "{} on {} returned {}",
            what, handle, rc
        )))
    }
}

impl DeviceControl for CallbackDevice {
    fn vibrate(&self, handle: DeviceHandle, kind: Vibration) -> Result<()> {
        match self.vibrate {
            Some(f) => check("vibrate", handle, unsafe { f(self.user_data, handle.0, kind) }),
            None => Ok(()),
        }
    }

    fn unlock(&self, handle: DeviceHandle, mode: UnlockMode) -> Result<()> {
        match self.unlock {
            Some(f) => check("unlock", handle, unsafe { f(self.user_data, handle.0, mode) }),
            None => Ok(()),
        }
    }

    fn set_subscriptions(&self, handle: DeviceHandle, subs: Subscriptions) -> Result<()> {
        match self.set_subscriptions {
            Some(f) => check(
                "set_subscriptions",
                handle,
                unsafe { f(self.user_data, handle.0, subs.bits()) },
            ),
            None => Ok(()),
        }
    }
}

/// Create a bridge and start its worker thread.
///
/// `remote_host` may be an IP literal or host name. When it is NULL the
/// destination and local port come from the `MYO_UDP_*` environment (or the
/// built-in defaults) and `remote_port`/`local_port` are ignored.
/// Trigger gesture and payload mode always come from the environment.
/// `callbacks` may be NULL for hosts without haptics.
/// Returns NULL on error (check mu_last_error()).
///
/// # Safety
/// `remote_host` must be a valid null-terminated string, or null.
/// `callbacks` must point to a valid `MuDeviceCallbacks`, or be null.
#[no_mangle]
pub unsafe extern "C" fn mu_bridge_new(
    remote_host: *const c_char,
    remote_port: u16,
    local_port: u16,
    callbacks: *const MuDeviceCallbacks,
) -> *mut MuBridge {
    let mut config = BridgeConfig::from_env();

    if !remote_host.is_null() {
        let host = CStr::from_ptr(remote_host).to_string_lossy();
        match config::resolve_remote(&host, remote_port) {
            Ok(remote) => {
                config.remote = remote;
                config.local_port = local_port;
            }
            Err(e) => {
                LAST_ERROR.set(&e);
                return std::ptr::null_mut();
            }
        }
    }

    let device: Box<dyn DeviceControl + Send> = if callbacks.is_null() {
        Box::new(NullDevice)
    } else {
        let cb = &*callbacks;
        Box::new(CallbackDevice {
            user_data: cb.user_data,
            vibrate: cb.vibrate,
            unlock: cb.unlock,
            set_subscriptions: cb.set_subscriptions,
        })
    };

    let tx = UdpTransmitter::new(config.remote, config.local_port);
    match EventPump::start(Bridge::new(config, device, tx)) {
        Ok(pump) => Box::into_raw(Box::new(MuBridge(pump))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Stop the bridge, handling events already pushed, and free it.
///
/// # Safety
/// `bridge` must be a pointer returned by `mu_bridge_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_bridge_free(bridge: *mut MuBridge) {
    if !bridge.is_null() {
        drop(Box::from_raw(bridge));
    }
}

unsafe fn push(bridge: *const MuBridge, event: DeviceEvent) -> c_int {
    if bridge.is_null() {
        return -1;
    }
    let bridge = &*bridge;
    match bridge.0.send(event) {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Report that a device connected. Returns 0 on success, -1 on error.
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_connected(bridge: *const MuBridge, handle: u64) -> c_int {
    push(bridge, DeviceEvent::Connected {
        handle: DeviceHandle(handle),
    })
}

/// Report that a device disconnected.
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_disconnected(bridge: *const MuBridge, handle: u64) -> c_int {
    push(bridge, DeviceEvent::Disconnected {
        handle: DeviceHandle(handle),
    })
}

/// Report a pose change. `pose` uses the libmyo numbering
/// (0 = rest, 1 = fist, 2 = wave in, 3 = wave out, 4 = fingers spread,
/// 5 = double tap, anything else = unknown).
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_pose(bridge: *const MuBridge, handle: u64, pose: c_int) -> c_int {
    push(bridge, DeviceEvent::PoseChanged {
        handle: DeviceHandle(handle),
        gesture: Gesture::from_raw(pose),
    })
}

/// Report an orientation sample in radians.
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_orientation(
    bridge: *const MuBridge,
    handle: u64,
    pitch: f64,
    roll: f64,
    yaw: f64,
) -> c_int {
    push(bridge, DeviceEvent::Orientation {
        handle: DeviceHandle(handle),
        sample: Orientation::new(pitch, roll, yaw),
    })
}

/// Report a lock (`locked = true`) or unlock notification.
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_lock(bridge: *const MuBridge, handle: u64, locked: bool) -> c_int {
    let handle = DeviceHandle(handle);
    let event = if locked {
        DeviceEvent::Locked { handle }
    } else {
        DeviceEvent::Unlocked { handle }
    };
    push(bridge, event)
}

/// Report an SDK failure for a device. Streaming for it stops silently.
///
/// # Safety
/// `bridge` must be a valid bridge pointer, or null.
/// `message` must be a valid null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn mu_push_error(
    bridge: *const MuBridge,
    handle: u64,
    message: *const c_char,
) -> c_int {
    let message = if message.is_null() {
        String::from("unspecified device error")
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    };
    push(bridge, DeviceEvent::Error {
        handle: DeviceHandle(handle),
        message,
    })
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next myo-udp API call.
#[no_mangle]
pub extern "C" fn mu_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::UdpSocket;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    unsafe extern "C" fn count_vibrate(
        user_data: *mut c_void,
        _handle: u64,
        _kind: Vibration,
    ) -> c_int {
        (*(user_data as *const AtomicU32)).fetch_add(1, Ordering::SeqCst);
        0
    }

    #[test]
    fn test_bridge_over_c_api() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = rx.local_addr().unwrap().port();

        let pulses = AtomicU32::new(0);
        let callbacks = MuDeviceCallbacks {
            user_data: &pulses as *const AtomicU32 as *mut c_void,
            vibrate: Some(count_vibrate),
            unlock: None,
            set_subscriptions: None,
        };

        let host = CString::new("127.0.0.1").unwrap();
        unsafe {
            let bridge = mu_bridge_new(host.as_ptr(), port, 0, &callbacks);
            assert!(!bridge.is_null());

            assert_eq!(mu_push_connected(bridge, 42), 0);
            assert_eq!(mu_push_pose(bridge, 42, 1), 0);
            assert_eq!(mu_push_orientation(bridge, 42, 0.0, 0.0, 0.0), 0);
            assert_eq!(mu_push_lock(bridge, 42, true), 0);
            assert_eq!(mu_push_pose(bridge, 42, 0), 0);
            mu_bridge_free(bridge);
        }

        let mut buf = [0u8; 16];
        let mut packets = Vec::new();
        for _ in 0..3 {
            let (n, _) = rx.recv_from(&mut buf).unwrap();
            packets.push(buf[..n].to_vec());
        }
        assert_eq!(packets, vec![vec![1], vec![128, 128, 128], vec![0]]);
        // long greeting, short on start, medium on release
        assert_eq!(pulses.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_null_bridge_is_rejected() {
        unsafe {
            assert_eq!(mu_push_connected(std::ptr::null(), 1), -1);
            mu_bridge_free(std::ptr::null_mut());
        }
    }
}
