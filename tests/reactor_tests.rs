// tests/reactor_tests.rs
//! End-to-end tests driving a real `Reactor` over real `TcpStream`
//! clients, covering the literal scenarios in spec.md §8.

use msgreactor::prelude::*;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn connect_with_retry(addr: std::net::SocketAddr) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(addr) {
            return stream;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("could not connect to {addr}");
}

/// Binds on an OS-chosen ephemeral port (`:0`) and returns the started
/// `Reactor` wrapped so its caller can run it on a background thread while
/// still holding a handle to call `broadcast`/`connection_count`/etc.
fn start_reactor(max_connections: usize, handler: Arc<MessageHandler>) -> Arc<Reactor> {
    let config = ReactorConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        max_connections,
        ..Default::default()
    };
    Arc::new(Reactor::start(config, handler).expect("reactor should bind an ephemeral port"))
}

#[test]
fn test_scenario_single_client_echo_roundtrip() {
    let handler: Arc<MessageHandler> = Arc::new(|_id, frame, conn: &mut Connection| {
        let mut reply = b"Server received: ".to_vec();
        reply.extend_from_slice(frame);
        let _ = conn.send_message(&reply);
    });
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut client = connect_with_retry(addr);
    client.write_all(b"hello\n").unwrap();

    let mut out = vec![0u8; 64];
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let n = client.read(&mut out).unwrap();
    assert_eq!(&out[..n], b"Server received: hello\n");

    drop(client);
    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_scenario_multiple_frames_one_write_preserve_order() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_cl = Arc::clone(&seen);
    let handler: Arc<MessageHandler> = Arc::new(move |_id, frame, _conn: &mut Connection| {
        seen_cl
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(frame).to_string());
    });
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut client = connect_with_retry(addr);
    client.write_all(b"a\nb\nc\n").unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);

    drop(client);
    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_scenario_split_write_reassembles_frame() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_cl = Arc::clone(&seen);
    let handler: Arc<MessageHandler> = Arc::new(move |_id, frame, _conn: &mut Connection| {
        seen_cl
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(frame).to_string());
    });
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut client = connect_with_retry(addr);
    client.write_all(b"hel").unwrap();
    thread::sleep(Duration::from_millis(100));
    client.write_all(b"lo\nworld\n").unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(*seen.lock().unwrap(), vec!["hello", "world"]);

    drop(client);
    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_scenario_ten_clients_three_frames_each_order_preserved() {
    let seen: Arc<Mutex<std::collections::HashMap<String, Vec<String>>>> =
        Arc::new(Mutex::new(std::collections::HashMap::new()));
    let seen_cl = Arc::clone(&seen);
    let handler: Arc<MessageHandler> = Arc::new(move |id, frame, conn: &mut Connection| {
        let text = String::from_utf8_lossy(frame).to_string();
        seen_cl
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push(text.clone());
        let mut reply = text.into_bytes();
        reply.push(b'!');
        let _ = conn.send_message(&reply);
    });
    let reactor = start_reactor(32, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut clients: Vec<TcpStream> = (0..10).map(|_| connect_with_retry(addr)).collect();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(reactor.connection_count(), 10);

    for (i, client) in clients.iter_mut().enumerate() {
        let msg = format!("c{i}-m1\nc{i}-m2\nc{i}-m3\n");
        client.write_all(msg.as_bytes()).unwrap();
    }

    thread::sleep(Duration::from_millis(300));

    let mut replies_total = 0;
    for client in clients.iter_mut() {
        client
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            match client.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.iter().filter(|&&b| b == b'\n').count() >= 3 {
                        break;
                    }
                }
            }
        }
        replies_total += buf.iter().filter(|&&b| b == b'\n').count();
    }
    assert_eq!(replies_total, 30);

    let recorded = seen.lock().unwrap();
    assert_eq!(recorded.len(), 10);
    for frames in recorded.values() {
        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with("m1"));
        assert!(frames[1].ends_with("m2"));
        assert!(frames[2].ends_with("m3"));
    }
    drop(recorded);

    drop(clients);
    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_scenario_oversized_frame_without_delimiter_forces_disconnect() {
    let got_called = Arc::new(AtomicUsize::new(0));
    let got_called_cl = Arc::clone(&got_called);
    let handler: Arc<MessageHandler> = Arc::new(move |_id, _frame, _conn: &mut Connection| {
        got_called_cl.fetch_add(1, Ordering::SeqCst);
    });
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut client = connect_with_retry(addr);
    let payload = vec![b'x'; 50 * 1024];
    client.write_all(&payload).unwrap();

    // Server should close the connection; a subsequent read observes EOF.
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = [0u8; 16];
    let result = client.read(&mut buf);
    assert!(matches!(result, Ok(0)) || result.is_err());
    assert_eq!(got_called.load(Ordering::SeqCst), 0);

    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_scenario_broadcast_reaches_every_client_once() {
    let handler: Arc<MessageHandler> = Arc::new(|_id, _frame, _conn: &mut Connection| {});
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    let stopper = reactor.stopper();

    // The accept loop only runs inside `run()`, so the loop must already be
    // spinning before clients connect and before `broadcast` can reach them.
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let mut clients: Vec<TcpStream> = (0..5).map(|_| connect_with_retry(addr)).collect();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(reactor.connection_count(), 5);

    reactor.broadcast(b"hi");
    thread::sleep(Duration::from_millis(100));

    for client in clients.iter_mut() {
        client
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi\n");
    }

    drop(clients);
    stopper.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_connection_count_tracks_live_clients() {
    let handler: Arc<MessageHandler> = Arc::new(|_id, _frame, _conn: &mut Connection| {});
    let reactor = start_reactor(16, handler);
    let addr = reactor.local_addr().unwrap();
    assert_eq!(reactor.connection_count(), 0);

    let stopper = reactor.stopper();
    let reactor_cl = Arc::clone(&reactor);
    let handle = thread::spawn(move || reactor_cl.run());

    let _c1 = connect_with_retry(addr);
    let _c2 = connect_with_retry(addr);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(reactor.connection_count(), 2);

    drop(_c1);
    thread::sleep(Duration::from_millis(100));
    stopper.stop();
    handle.join().unwrap().unwrap();
}
