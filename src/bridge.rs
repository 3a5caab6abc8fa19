use crate::activation::{ActivationMachine, IDLE_SUBSCRIPTIONS};
use crate::config::BridgeConfig;
use crate::device::{DeviceControl, DeviceEvent};
use crate::transport::Transmitter;
use crate::types::{DeviceHandle, StreamingState, Subscriptions, UnlockMode, Vibration};
use std::collections::HashMap;

/// Routes device notifications to one [`ActivationMachine`] per armband.
///
/// Also does the connection housekeeping: on connect the armband is put in
/// unlock-hold so it does not relock between poses, greeted with a long
/// pulse and subscribed to pose and lock notifications.
pub struct Bridge<D, T> {
    config: BridgeConfig,
    device: D,
    tx: T,
    machines: HashMap<DeviceHandle, ActivationMachine>,
}

impl<D, T> Bridge<D, T>
where
    D: DeviceControl,
    T: Transmitter,
{
    pub fn new(config: BridgeConfig, device: D, tx: T) -> Self {
        Self {
            config,
            device,
            tx,
            machines: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Streaming state of a known device.
    pub fn state(&self, handle: DeviceHandle) -> Option<StreamingState> {
        self.machines.get(&handle).map(|m| m.state())
    }

    pub fn machine(&self, handle: DeviceHandle) -> Option<&ActivationMachine> {
        self.machines.get(&handle)
    }

    /// Number of devices currently tracked.
    pub fn device_count(&self) -> usize {
        self.machines.len()
    }

    pub fn handle_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connected { handle } => self.on_connected(handle),
            DeviceEvent::Disconnected { handle } => self.on_disconnected(handle),
            DeviceEvent::PoseChanged { handle, gesture } => {
                log::info!("Device {}: detected {} pose", handle, gesture);
                let config = &self.config;
                let machine = self
                    .machines
                    .entry(handle)
                    .or_insert_with(|| ActivationMachine::new(handle, config));
                machine.on_pose(gesture, &self.device, &self.tx);
            }
            DeviceEvent::Orientation { handle, sample } => match self.machines.get_mut(&handle) {
                Some(machine) => {
                    machine.on_orientation(sample, &self.tx);
                }
                None => log::trace!("Device {}: orientation from unknown device", handle),
            },
            DeviceEvent::Locked { handle } => log::info!("Device {}: locked", handle),
            DeviceEvent::Unlocked { handle } => log::info!("Device {}: unlocked", handle),
            DeviceEvent::Error { handle, message } => {
                log::warn!("Device {}: {}", handle, message);
                if let Some(machine) = self.machines.get_mut(&handle) {
                    if machine.on_device_error(&self.device) {
                        log::info!("Device {}: streaming aborted", handle);
                    }
                }
            }
        }
    }

    fn on_connected(&mut self, handle: DeviceHandle) {
        log::info!("Connected to device {}", handle);

        if let Some(mut stale) = self.machines.remove(&handle) {
            stale.on_device_error(&self.device);
        }

        if let Err(e) = self.device.unlock(handle, UnlockMode::Hold) {
            log::warn!("Device {}: unlock failed: {}", handle, e);
        }
        if let Err(e) = self.device.vibrate(handle, Vibration::Long) {
            log::warn!("Device {}: greeting pulse failed: {}", handle, e);
        }
        if let Err(e) = self.device.set_subscriptions(handle, IDLE_SUBSCRIPTIONS) {
            log::warn!("Device {}: subscribe failed: {}", handle, e);
        }

        self.machines
            .insert(handle, ActivationMachine::new(handle, &self.config));
    }

    fn on_disconnected(&mut self, handle: DeviceHandle) {
        log::info!("Disconnected from device {}", handle);

        if let Some(mut machine) = self.machines.remove(&handle) {
            if machine.on_device_error(&self.device) {
                log::info!("Device {}: streaming aborted by disconnect", handle);
            }
        }
        if let Err(e) = self.device.set_subscriptions(handle, Subscriptions::empty()) {
            log::debug!("Device {}: unsubscribe after disconnect failed: {}", handle, e);
        }
    }
}
