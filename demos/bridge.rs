//! Drive the bridge from a line-based event script on stdin.
//!
//! Stands in for the armband SDK so the UDP side can be exercised without
//! hardware. One event per line:
//!
//!   connect [handle]
//!   disconnect [handle]
//!   pose <rest|fist|wave_in|wave_out|fingers_spread|double_tap> [handle]
//!   orient <pitch> <roll> <yaw> [handle]      (radians)
//!   lock | unlock [handle]
//!   error <message...>
//!   quit
//!
//! Destination and trigger come from the MYO_UDP_* environment variables.
//!
//! Usage:
//!   MYO_UDP_REMOTE=127.0.0.1:57701 cargo run --example bridge < script.txt

use myo_udp::{Bridge, BridgeConfig, DeviceEvent, DeviceHandle, EventPump, Gesture};
use myo_udp::{NullDevice, Orientation, UdpTransmitter};
use std::io::{self, BufRead};

const DEFAULT_HANDLE: DeviceHandle = DeviceHandle(1);

fn main() {
    env_logger::init();

    let config = BridgeConfig::from_env();
    eprintln!("Streaming to {} from local port {}", config.remote, config.local_port);
    eprintln!("Trigger: {}  Payload: {:?}", config.trigger, config.payload);

    let tx = UdpTransmitter::new(config.remote, config.local_port);
    let pump = match EventPump::start(Bridge::new(config, NullDevice, tx)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to start bridge: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Reading events from stdin ('quit' or EOF to stop)...");

    let stdin = io::stdin();
    for (lineno, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("stdin error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "quit" {
            break;
        }

        match parse_event(line) {
            Some(event) => {
                if let Err(e) = pump.send(event) {
                    eprintln!("Bridge stopped: {}", e);
                    break;
                }
            }
            None => eprintln!("line {}: cannot parse '{}'", lineno + 1, line),
        }
    }

    pump.stop();
}

fn parse_event(line: &str) -> Option<DeviceEvent> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let rest: Vec<&str> = words.collect();

    let handle_at = |i: usize| -> Option<DeviceHandle> {
        match rest.get(i) {
            Some(w) => w.parse::<u64>().ok().map(DeviceHandle),
            None => Some(DEFAULT_HANDLE),
        }
    };

    match verb {
        "connect" => Some(DeviceEvent::Connected { handle: handle_at(0)? }),
        "disconnect" => Some(DeviceEvent::Disconnected { handle: handle_at(0)? }),
        "lock" => Some(DeviceEvent::Locked { handle: handle_at(0)? }),
        "unlock" => Some(DeviceEvent::Unlocked { handle: handle_at(0)? }),
        "pose" => Some(DeviceEvent::PoseChanged {
            gesture: Gesture::from_name(rest.first()?)?,
            handle: handle_at(1)?,
        }),
        "orient" => {
            let pitch = rest.first()?.parse().ok()?;
            let roll = rest.get(1)?.parse().ok()?;
            let yaw = rest.get(2)?.parse().ok()?;
            Some(DeviceEvent::Orientation {
                handle: handle_at(3)?,
                sample: Orientation::new(pitch, roll, yaw),
            })
        }
        "error" => Some(DeviceEvent::Error {
            handle: DEFAULT_HANDLE,
            message: rest.join(" "),
        }),
        _ => None,
    }
}
