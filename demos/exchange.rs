//! Request/response example.
//!
//! Starts a loopback peer that answers every request with a greeting frame,
//! then exchanges a few requests with it.
//!
//! Run: cargo run --example exchange

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use tcp_exchanger::{TcpExchanger, encode_frame, hex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    println!("Peer listening on {addr}");

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            thread::spawn(move || {
                let mut prefix = [0u8; 2];
                while stream.read_exact(&mut prefix).is_ok() {
                    let mut body = vec![0u8; u16::from_be_bytes(prefix) as usize];
                    if stream.read_exact(&mut body).is_err() {
                        break;
                    }
                    let mut reply = b"hello, ".to_vec();
                    reply.extend_from_slice(&body);
                    let Ok(frame) = encode_frame(&reply) else { break };
                    if stream.write_all(&frame).is_err() {
                        break;
                    }
                }
            });
        }
    });

    let exchanger = TcpExchanger::builder(addr)
        .max_send_attempts(3)
        .timeout(Duration::from_secs(2))
        .build();
    println!("Created {exchanger}");

    for name in ["alice", "bob", "carol"] {
        let request = encode_frame(name.as_bytes())?;
        let response = exchanger.send(&request);
        if response.is_empty() {
            println!("{name}: no response");
            continue;
        }
        println!(
            "{name}: {} ({})",
            String::from_utf8_lossy(response.get(2..).unwrap_or_default()),
            hex::encode(&response)
        );
    }

    let stats = exchanger.stats();
    println!(
        "Sent {} requests, received {} responses over {} connection(s)",
        stats.requests_sent, stats.responses_received, stats.connect_count
    );

    exchanger.shutdown();
    Ok(())
}
