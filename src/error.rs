use std::ffi::{c_char, CString};
use std::sync::Mutex;

/// Errors that can occur while bridging device events to UDP.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("UDP transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to spawn bridge thread: {0}")]
    ThreadSpawn(String),

    #[error("Event queue full")]
    QueueFull,

    #[error("Event channel disconnected")]
    ChannelDisconnected,
}

/// Most recent error, kept as a C string for `mu_last_error()`.
pub(crate) struct LastError {
    message: Mutex<Option<CString>>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: Mutex::new(None),
        }
    }

    pub fn set(&self, err: &BridgeError) {
        // Interior NULs can only come from host-supplied text; cut there.
        let text = err.to_string();
        let text = match text.find('\0') {
            Some(end) => &text[..end],
            None => text.as_str(),
        };
        if let Ok(mut slot) = self.message.lock() {
            *slot = CString::new(text).ok();
        }
    }

    /// Pointer stays valid until the next `set`.
    pub fn as_ptr(&self) -> *const c_char {
        match self.message.lock() {
            Ok(slot) => slot.as_ref().map_or(std::ptr::null(), |msg| msg.as_ptr()),
            Err(_) => std::ptr::null(),
        }
    }
}
