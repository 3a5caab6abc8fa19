use crate::config::BridgeConfig;
use crate::device::DeviceControl;
use crate::protocol::{self, Packet};
use crate::transport::{send_packet, Transmitter};
use crate::types::{
    DeviceHandle, Gesture, Orientation, PayloadMode, RetriggerPolicy, StreamingState,
    Subscriptions, Vibration,
};

/// Notifications wanted from a connected device that is not streaming.
pub const IDLE_SUBSCRIPTIONS: Subscriptions = Subscriptions::POSE.union(Subscriptions::LOCK);

/// Per-device streaming state.
///
/// Starts `Idle`. The trigger gesture moves it to `Active`, any other gesture
/// moves it back. While active, the first orientation sample becomes the
/// baseline and every sample is sent as a 3-byte packet.
///
/// Calls for one device must be serialized; the machine holds no lock.
#[derive(Debug)]
pub struct ActivationMachine {
    handle: DeviceHandle,
    trigger: Gesture,
    retrigger: RetriggerPolicy,
    payload: PayloadMode,
    state: StreamingState,
    baseline: Option<Orientation>,
    subscriptions: Subscriptions,
}

impl ActivationMachine {
    pub fn new(handle: DeviceHandle, config: &BridgeConfig) -> Self {
        Self {
            handle,
            trigger: config.trigger,
            retrigger: config.retrigger,
            payload: config.payload,
            state: StreamingState::Idle,
            baseline: None,
            subscriptions: IDLE_SUBSCRIPTIONS,
        }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn state(&self) -> StreamingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamingState::Active
    }

    /// Reference orientation of the current activation, once captured.
    pub fn baseline(&self) -> Option<Orientation> {
        self.baseline
    }

    pub fn subscriptions(&self) -> Subscriptions {
        self.subscriptions
    }

    /// Handle a pose-change notification.
    pub fn on_pose<D, T>(&mut self, gesture: Gesture, device: &D, tx: &T)
    where
        D: DeviceControl + ?Sized,
        T: Transmitter + ?Sized,
    {
        let is_trigger = gesture == self.trigger;

        match (self.state, is_trigger) {
            (StreamingState::Idle, true) => self.activate(device, tx),
            (StreamingState::Idle, false) => {}
            (StreamingState::Active, true) => match self.retrigger {
                RetriggerPolicy::Ignore => {
                    log::debug!("Device {}: {} while streaming, ignored", self.handle, gesture);
                }
                RetriggerPolicy::Restart => {
                    log::info!("Device {}: {} while streaming, restarting", self.handle, gesture);
                    if self.pulse(device, Vibration::Short) {
                        self.start(tx);
                    } else {
                        log::warn!("Device {}: haptics failed, streaming stopped", self.handle);
                        self.on_device_error(device);
                    }
                }
            },
            (StreamingState::Active, false) => self.deactivate(device, tx),
        }
    }

    /// Handle an orientation sample.
    ///
    /// Returns `baseline - sample` when a packet was produced, `None` while idle.
    pub fn on_orientation<T>(&mut self, sample: Orientation, tx: &T) -> Option<Orientation>
    where
        T: Transmitter + ?Sized,
    {
        if self.state == StreamingState::Idle {
            log::trace!("Device {}: orientation while idle, dropped", self.handle);
            return None;
        }

        let baseline = *self.baseline.get_or_insert_with(|| {
            log::debug!("Device {}: baseline {:?}", self.handle, sample);
            sample
        });
        let delta = sample.delta_from(&baseline);

        let packet = match self.payload {
            PayloadMode::Absolute => protocol::encode_sample(&sample),
            PayloadMode::Delta => protocol::encode_orientation(
                protocol::wrap_angle(delta.pitch),
                protocol::wrap_angle(delta.roll),
                protocol::wrap_angle(delta.yaw),
            ),
        };
        send_packet(tx, packet);

        Some(delta)
    }

    /// Tear down after the device SDK reported a failure.
    ///
    /// Leaves the machine idle without sending a stop packet or pulsing.
    /// Returns whether it was streaming.
    pub fn on_device_error<D>(&mut self, device: &D) -> bool
    where
        D: DeviceControl + ?Sized,
    {
        let was_active = self.is_active();
        self.state = StreamingState::Idle;
        self.baseline = None;
        if self.subscriptions.contains(Subscriptions::ORIENTATION) {
            self.update_subscriptions(device, self.subscriptions - Subscriptions::ORIENTATION);
        }
        was_active
    }

    fn activate<D, T>(&mut self, device: &D, tx: &T)
    where
        D: DeviceControl + ?Sized,
        T: Transmitter + ?Sized,
    {
        // Without orientation delivery there is nothing to stream.
        if !self.update_subscriptions(device, self.subscriptions | Subscriptions::ORIENTATION) {
            log::warn!("Device {}: cannot subscribe to orientation, staying idle", self.handle);
            return;
        }
        // The pulse is the user's cue; no Start goes out without it.
        if !self.pulse(device, Vibration::Short) {
            log::warn!("Device {}: haptics failed, staying idle", self.handle);
            self.update_subscriptions(device, self.subscriptions - Subscriptions::ORIENTATION);
            return;
        }
        log::info!("Device {}: streaming started", self.handle);
        self.state = StreamingState::Active;
        self.start(tx);
    }

    fn start<T>(&mut self, tx: &T)
    where
        T: Transmitter + ?Sized,
    {
        self.baseline = None;
        send_packet(tx, protocol::encode_control(true));
    }

    fn deactivate<D, T>(&mut self, device: &D, tx: &T)
    where
        D: DeviceControl + ?Sized,
        T: Transmitter + ?Sized,
    {
        if self.baseline.is_some() {
            self.pulse(device, Vibration::Medium);
        }
        self.baseline = None;
        self.state = StreamingState::Idle;
        send_packet(tx, Packet::Stop);
        self.update_subscriptions(device, self.subscriptions - Subscriptions::ORIENTATION);
        log::info!("Device {}: streaming stopped", self.handle);
    }

    fn pulse<D>(&self, device: &D, kind: Vibration) -> bool
    where
        D: DeviceControl + ?Sized,
    {
        match device.vibrate(self.handle, kind) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Device {}: {:?} pulse failed: {}", self.handle, kind, e);
                false
            }
        }
    }

    fn update_subscriptions<D>(&mut self, device: &D, subs: Subscriptions) -> bool
    where
        D: DeviceControl + ?Sized,
    {
        match device.set_subscriptions(self.handle, subs) {
            Ok(()) => {
                self.subscriptions = subs;
                true
            }
            Err(e) => {
                log::warn!("Device {}: subscription change failed: {}", self.handle, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::RecordingDevice;
    use crate::transport::testing::RecordingTransmitter;
    use std::f64::consts::PI;

    const HANDLE: DeviceHandle = DeviceHandle(1);

    fn machine(config: &BridgeConfig) -> ActivationMachine {
        ActivationMachine::new(HANDLE, config)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx);
        m.on_pose(Gesture::Rest, &device, &tx);

        assert_eq!(tx.sent(), vec![vec![1], vec![128, 128, 128], vec![0]]);
        assert_eq!(m.state(), StreamingState::Idle);
        assert_eq!(m.baseline(), None);
        assert_eq!(device.vibrations(), vec![Vibration::Short, Vibration::Medium]);
    }

    #[test]
    fn test_baseline_captured_once_per_activation() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        let a = Orientation::new(0.1, 0.2, 0.3);
        let b = Orientation::new(0.4, 0.5, 0.6);
        let c = Orientation::new(-0.4, -0.5, -0.6);

        m.on_pose(Gesture::Fist, &device, &tx);
        assert_eq!(m.baseline(), None);

        let delta_a = m.on_orientation(a, &tx).unwrap();
        assert_eq!(m.baseline(), Some(a));
        assert_eq!(delta_a, Orientation::new(0.0, 0.0, 0.0));

        m.on_orientation(b, &tx);
        let delta_c = m.on_orientation(c, &tx).unwrap();
        assert_eq!(m.baseline(), Some(a));
        assert!((delta_c.pitch - 0.5).abs() < 1e-12);

        // Next activation captures afresh.
        m.on_pose(Gesture::Rest, &device, &tx);
        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(b, &tx);
        assert_eq!(m.baseline(), Some(b));
    }

    #[test]
    fn test_absolute_payload_ignores_baseline() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(1.0, 1.0, 1.0), &tx);
        m.on_orientation(Orientation::new(-PI / 2.0, 0.0, 1.0), &tx);

        let sent = tx.sent();
        assert_eq!(sent[1], vec![168, 168, 168]);
        assert_eq!(sent[2], vec![64, 128, 168]);
    }

    #[test]
    fn test_delta_payload_encodes_wrapped_delta() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default().with_payload(PayloadMode::Delta));

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(1.0, 1.0, 3.0), &tx);
        // delta = (1 - 2, 1 - 1, 3 - (-3)) = (-1, 0, 6) -> yaw wraps to 6 - 2π
        m.on_orientation(Orientation::new(2.0, 1.0, -3.0), &tx);

        let sent = tx.sent();
        assert_eq!(sent[1], vec![128, 128, 128]);
        assert_eq!(
            sent[2],
            vec![
                protocol::quantize_angle(-1.0),
                128,
                protocol::quantize_angle(6.0 - 2.0 * PI),
            ]
        );
    }

    #[test]
    fn test_no_packets_while_idle() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        assert_eq!(m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx), None);
        m.on_pose(Gesture::Rest, &device, &tx);
        m.on_pose(Gesture::WaveIn, &device, &tx);
        assert_eq!(m.on_orientation(Orientation::new(0.3, 0.0, 0.0), &tx), None);

        assert!(tx.sent().is_empty());
        assert!(device.commands().is_empty());
        assert_eq!(m.baseline(), None);
    }

    #[test]
    fn test_repeated_trigger_ignored_by_default() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());
        let a = Orientation::new(0.1, 0.1, 0.1);

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(a, &tx);
        m.on_pose(Gesture::Fist, &device, &tx);

        assert_eq!(tx.sent(), vec![vec![1], protocol::encode_sample(&a).as_bytes().to_vec()]);
        assert_eq!(m.baseline(), Some(a));
        assert_eq!(device.vibrations(), vec![Vibration::Short]);
    }

    #[test]
    fn test_repeated_trigger_restart_policy() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m =
            machine(&BridgeConfig::default().with_retrigger(RetriggerPolicy::Restart));
        let a = Orientation::new(0.1, 0.1, 0.1);
        let b = Orientation::new(0.2, 0.2, 0.2);

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(a, &tx);
        m.on_pose(Gesture::Fist, &device, &tx);
        assert!(m.is_active());
        assert_eq!(m.baseline(), None);
        m.on_orientation(b, &tx);
        assert_eq!(m.baseline(), Some(b));

        let sent = tx.sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], vec![1]);
        assert_eq!(sent[2], vec![1]);
        assert_eq!(device.vibrations(), vec![Vibration::Short, Vibration::Short]);
    }

    #[test]
    fn test_release_without_samples_skips_medium_pulse() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_pose(Gesture::FingersSpread, &device, &tx);

        assert_eq!(tx.sent(), vec![vec![1], vec![0]]);
        assert_eq!(device.vibrations(), vec![Vibration::Short]);
    }

    #[test]
    fn test_subscription_churn() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        assert_eq!(
            device.last_subscriptions(HANDLE),
            Some(IDLE_SUBSCRIPTIONS | Subscriptions::ORIENTATION)
        );
        m.on_pose(Gesture::Rest, &device, &tx);
        assert_eq!(device.last_subscriptions(HANDLE), Some(IDLE_SUBSCRIPTIONS));
        assert_eq!(m.subscriptions(), IDLE_SUBSCRIPTIONS);
    }

    #[test]
    fn test_custom_trigger_gesture() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default().with_trigger(Gesture::DoubleTap));

        m.on_pose(Gesture::Fist, &device, &tx);
        assert!(!m.is_active());
        m.on_pose(Gesture::DoubleTap, &device, &tx);
        assert!(m.is_active());
        m.on_pose(Gesture::Fist, &device, &tx);
        assert!(!m.is_active());
        assert_eq!(tx.sent(), vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_transport_failure_keeps_state() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        tx.set_failing(true);
        m.on_pose(Gesture::Fist, &device, &tx);
        let a = Orientation::new(0.0, 0.0, 0.0);
        assert!(m.on_orientation(a, &tx).is_some());
        assert!(m.is_active());
        assert_eq!(m.baseline(), Some(a));

        tx.set_failing(false);
        m.on_orientation(a, &tx);
        assert_eq!(tx.sent(), vec![vec![128, 128, 128]]);
    }

    #[test]
    fn test_subscribe_failure_stays_idle() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        device.fail_subscriptions.set(true);
        m.on_pose(Gesture::Fist, &device, &tx);

        assert!(!m.is_active());
        assert!(tx.sent().is_empty());
        assert!(device.vibrations().is_empty());
    }

    #[test]
    fn test_haptic_failure_blocks_activation() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        device.fail_vibrate.set(true);
        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx);

        assert!(!m.is_active());
        assert!(tx.sent().is_empty());
        assert_eq!(m.subscriptions(), IDLE_SUBSCRIPTIONS);

        // Haptics back: the next trigger works normally.
        device.fail_vibrate.set(false);
        m.on_pose(Gesture::Fist, &device, &tx);
        assert!(m.is_active());
        assert_eq!(tx.sent(), vec![vec![1]]);
    }

    #[test]
    fn test_haptic_failure_on_restart_tears_down() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m =
            machine(&BridgeConfig::default().with_retrigger(RetriggerPolicy::Restart));

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx);
        device.fail_vibrate.set(true);
        m.on_pose(Gesture::Fist, &device, &tx);

        assert!(!m.is_active());
        assert_eq!(m.baseline(), None);
        assert_eq!(m.subscriptions(), IDLE_SUBSCRIPTIONS);
        assert_eq!(tx.sent(), vec![vec![1], vec![128, 128, 128]]);
    }

    #[test]
    fn test_medium_pulse_failure_still_stops() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx);
        device.fail_vibrate.set(true);
        m.on_pose(Gesture::Rest, &device, &tx);

        assert!(!m.is_active());
        assert_eq!(tx.sent().last(), Some(&vec![0]));
    }

    #[test]
    fn test_device_error_tears_down_silently() {
        let device = RecordingDevice::default();
        let tx = RecordingTransmitter::default();
        let mut m = machine(&BridgeConfig::default());

        m.on_pose(Gesture::Fist, &device, &tx);
        m.on_orientation(Orientation::new(0.0, 0.0, 0.0), &tx);
        assert!(m.on_device_error(&device));

        assert!(!m.is_active());
        assert_eq!(m.baseline(), None);
        assert_eq!(m.subscriptions(), IDLE_SUBSCRIPTIONS);
        assert_eq!(tx.sent(), vec![vec![1], vec![128, 128, 128]]);
        assert_eq!(device.vibrations(), vec![Vibration::Short]);

        // Already idle: nothing to undo.
        assert!(!m.on_device_error(&device));
    }
}
