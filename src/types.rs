use std::fmt;

/// Device attitude reported by the armband, in radians.
///
/// Each angle lies in the open interval (-π, π).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl Orientation {
    pub const fn new(pitch: f64, roll: f64, yaw: f64) -> Self {
        Self { pitch, roll, yaw }
    }

    /// Per-axis `baseline - self`. Magnitude is bounded by 2π on each axis.
    pub fn delta_from(&self, baseline: &Orientation) -> Orientation {
        Orientation {
            pitch: baseline.pitch - self.pitch,
            roll: baseline.roll - self.roll,
            yaw: baseline.yaw - self.yaw,
        }
    }
}

/// Opaque identifier the device collaborator assigns to an armband.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub u64);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Hand pose classification reported on pose-change.
///
/// Raw values follow the libmyo `pose` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Rest,
    Fist,
    WaveIn,
    WaveOut,
    FingersSpread,
    DoubleTap,
    Unknown,
}

impl Gesture {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Rest,
            1 => Self::Fist,
            2 => Self::WaveIn,
            3 => Self::WaveOut,
            4 => Self::FingersSpread,
            5 => Self::DoubleTap,
            _ => Self::Unknown,
        }
    }

    /// Parse a gesture name as used in config and event scripts.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match name.as_str() {
            "rest" => Some(Self::Rest),
            "fist" => Some(Self::Fist),
            "wave_in" => Some(Self::WaveIn),
            "wave_out" => Some(Self::WaveOut),
            "fingers_spread" | "spread" => Some(Self::FingersSpread),
            "double_tap" => Some(Self::DoubleTap),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Fist => "fist",
            Self::WaveIn => "wave_in",
            Self::WaveOut => "wave_out",
            Self::FingersSpread => "fingers_spread",
            Self::DoubleTap => "double_tap",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Haptic pulse length requested from the device.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vibration {
    Short = 0,
    Medium = 1,
    Long = 2,
}

/// How the armband should stay unlocked.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMode {
    /// Relock after a short period of inactivity.
    Timed = 0,
    /// Stay unlocked until told otherwise.
    Hold = 1,
}

/// Whether orientation is currently being streamed for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingState {
    #[default]
    Idle,
    Active,
}

/// What goes into a 3-byte data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// The current absolute sample. This is what existing consumers expect.
    #[default]
    Absolute,
    /// `baseline - sample`, wrapped to [-π, π) before quantization.
    Delta,
}

/// Behaviour on a trigger gesture while already streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetriggerPolicy {
    /// Stay active, keep the baseline, send nothing.
    #[default]
    Ignore,
    /// Re-send start, reset the baseline and pulse again.
    Restart,
}

bitflags::bitflags! {
    /// Notification kinds the bridge wants delivered for a device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[repr(C)]
    pub struct Subscriptions: u32 {
        const POSE        = 1 << 0;
        const ORIENTATION = 1 << 1;
        const LOCK        = 1 << 2;
    }
}
