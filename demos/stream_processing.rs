// demos/stream_processing.rs
//! Runs the reactor against an in-process echo handler and a real TCP
//! client, demonstrating framing, the outbound write-cursor, and
//! cooperative shutdown end to end.

use msgreactor::prelude::*;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== Streaming Reactor Demo ===\n");

    let handler: Arc<MessageHandler> = Arc::new(|_id, frame, conn: &mut Connection| {
        let mut reply = b"Server received: ".to_vec();
        reply.extend_from_slice(frame);
        let _ = conn.send_message(&reply);
    });

    let config = ReactorConfig {
        bind_addr: "127.0.0.1:17890".parse().unwrap(),
        ..Default::default()
    };
    let reactor = Reactor::start(config, handler).expect("reactor should bind");
    let stopper = reactor.stopper();

    let handle = thread::spawn(move || reactor.run());
    thread::sleep(Duration::from_millis(50));

    let mut client = TcpStream::connect("127.0.0.1:17890").expect("reactor is listening");
    client.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

    // Multiple frames in one write: the reactor must extract and dispatch
    // each one in order, not just the first.
    client.write_all(b"hello\nworld\nfinal\n").unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    // Three replies are expected; keep reading until we have all of them
    // or the read times out.
    while received.iter().filter(|&&b| b == b'\n').count() < 3 {
        match client.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
    println!(
        "Replies received:\n{}",
        String::from_utf8_lossy(&received)
    );

    drop(client);
    stopper.stop();
    let _ = handle.join();
    println!("Reactor stopped cleanly.");
}
