use crate::types::Orientation;
use std::f64::consts::PI;

// -- Control payloads --
pub const CONTROL_STOP: u8 = 0;
pub const CONTROL_START: u8 = 1;

// -- Packet geometry --
pub const CONTROL_PACKET_LEN: usize = 1;
pub const ORIENTATION_PACKET_LEN: usize = 3;

/// Quantization steps across the full (-π, π) range.
///
/// One step more than a byte can hold: `+π` would land on 256 and is clamped.
pub const ANGLE_STEPS: f64 = 256.0;

/// A UDP payload. The receiver tells kinds apart by length alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    Start,
    Stop,
    /// `[pitch, roll, yaw]`, each quantized with [`quantize_angle`].
    Orientation([u8; ORIENTATION_PACKET_LEN]),
}

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Packet::Start => &[CONTROL_START],
            Packet::Stop => &[CONTROL_STOP],
            Packet::Orientation(bytes) => bytes,
        }
    }

    /// Datagram size in bytes.
    pub fn wire_len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_control(&self) -> bool {
        !matches!(self, Packet::Orientation(_))
    }
}

/// Build the 1-byte start (`1`) or stop (`0`) packet.
pub fn encode_control(is_start: bool) -> Packet {
    if is_start {
        Packet::Start
    } else {
        Packet::Stop
    }
}

/// Build the 3-byte orientation packet.
pub fn encode_orientation(pitch: f64, roll: f64, yaw: f64) -> Packet {
    Packet::Orientation([
        quantize_angle(pitch),
        quantize_angle(roll),
        quantize_angle(yaw),
    ])
}

/// Convenience wrapper over [`encode_orientation`].
pub fn encode_sample(sample: &Orientation) -> Packet {
    encode_orientation(sample.pitch, sample.roll, sample.yaw)
}

/// Map an angle in (-π, π) onto 0..=255.
///
/// `floor((angle + π) / 2π * 256)`, clamped. Values outside the domain
/// saturate at the ends; NaN maps to 0.
pub fn quantize_angle(angle: f64) -> u8 {
    let scaled = ((angle + PI) / (2.0 * PI) * ANGLE_STEPS).floor();
    // `as` saturates and sends NaN to 0; the clamp keeps the intent explicit.
    scaled.clamp(0.0, 255.0) as u8
}

/// Wrap an angle into [-π, π).
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
