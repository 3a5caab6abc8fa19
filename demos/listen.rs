//! Print every packet the bridge sends.
//!
//! Usage: cargo run --example listen [bind_addr]
//! Default bind address is 0.0.0.0:57701.

use std::f64::consts::PI;
use std::net::UdpSocket;

fn main() {
    env_logger::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:57701".to_string());
    let socket = match UdpSocket::bind(&addr) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    println!("Listening on {} (Ctrl+C to stop)...", addr);

    let mut buf = [0u8; 64];
    loop {
        let (n, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("recv error: {}", e);
                continue;
            }
        };

        match &buf[..n] {
            [1] => println!("{}  START", from),
            [0] => println!("{}  STOP", from),
            [p, r, y] => println!(
                "{}  pitch={:+.3} roll={:+.3} yaw={:+.3}  raw=[{:3}, {:3}, {:3}]",
                from,
                byte_to_angle(*p),
                byte_to_angle(*r),
                byte_to_angle(*y),
                p,
                r,
                y
            ),
            other => println!("{}  unexpected {}-byte packet {:02x?}", from, other.len(), other),
        }
    }
}

/// Lower edge of the quantization bucket, in radians.
fn byte_to_angle(b: u8) -> f64 {
    b as f64 / 256.0 * 2.0 * PI - PI
}
