use crate::bridge::Bridge;
use crate::device::{DeviceControl, DeviceEvent};
use crate::transport::Transmitter;
use crate::{BridgeError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Queue depth between the SDK callback thread and the bridge thread.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// How long a pose or lifecycle event may wait for room in a full queue.
pub const CONTROL_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the bridge thread checks its stop flag when idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs a [`Bridge`] on its own thread.
///
/// SDK callbacks only enqueue events through an [`EventSender`], so every
/// event for every device is handled in order on one thread and the
/// activation state needs no locking.
pub struct EventPump {
    sender: Sender<DeviceEvent>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

/// Cloneable handle for feeding events into an [`EventPump`].
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<DeviceEvent>,
}

impl EventSender {
    /// Enqueue an event.
    ///
    /// Orientation samples never block: on a full queue they are dropped,
    /// the next sample supersedes them. Every other event waits up to
    /// [`CONTROL_SEND_TIMEOUT`] for room, since losing a release pose or a
    /// disconnect would leave the remote side streaming. If it still cannot
    /// be queued, [`BridgeError::QueueFull`] is returned.
    pub fn send(&self, event: DeviceEvent) -> Result<()> {
        if let DeviceEvent::Orientation { .. } = event {
            return match self.sender.try_send(event) {
                Ok(()) => Ok(()),
                Err(crossbeam_channel::TrySendError::Full(event)) => {
                    log::trace!("Event queue full, dropping {:?}", event);
                    Ok(())
                }
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                    Err(BridgeError::ChannelDisconnected)
                }
            };
        }

        match self.sender.send_timeout(event, CONTROL_SEND_TIMEOUT) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::SendTimeoutError::Timeout(event)) => {
                log::warn!("Event queue stuck, dropping {:?}", event);
                Err(BridgeError::QueueFull)
            }
            Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                Err(BridgeError::ChannelDisconnected)
            }
        }
    }
}

impl EventPump {
    /// Start the bridge thread.
    pub fn start<D, T>(bridge: Bridge<D, T>) -> Result<EventPump>
    where
        D: DeviceControl + Send + 'static,
        T: Transmitter + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(EVENT_QUEUE_DEPTH);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("myo-udp-bridge".into())
            .spawn(move || {
                bridge_loop(bridge, receiver, stop_clone);
            })
            .map_err(|e| BridgeError::ThreadSpawn(e.to_string()))?;

        Ok(EventPump {
            sender,
            stop_flag,
            thread: Some(thread),
        })
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Enqueue an event. See [`EventSender::send`].
    pub fn send(&self, event: DeviceEvent) -> Result<()> {
        self.sender().send(event)
    }

    /// Check if the bridge thread is still running.
    pub fn is_running(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Handle the events already queued, then stop the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bridge_loop<D, T>(
    mut bridge: Bridge<D, T>,
    receiver: Receiver<DeviceEvent>,
    stop_flag: Arc<AtomicBool>,
) where
    D: DeviceControl,
    T: Transmitter,
{
    log::info!("Bridge thread started");

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            // Bounded so a flooding producer cannot hold the thread open.
            for event in receiver.try_iter().take(EVENT_QUEUE_DEPTH) {
                bridge.handle_event(event);
            }
            log::info!("Bridge thread stopping (stop flag set)");
            break;
        }

        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(event) => bridge.handle_event(event),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::info!("Event channel disconnected, stopping bridge thread");
                break;
            }
        }
    }
}
