//! Integration tests for the live telemetry link
//!
//! Each test runs a small line-based TCP server on an ephemeral port and
//! drives the real link worker thread against it.

mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

use common::builders::SessionBuilder;
use common::test_timeout;
use ridevis_rs::backend::wire::{encode_line, InboundMessage};
use ridevis_rs::backend::{wire, LinkEvent, LinkHandle, LinkRequest, LiveBackend};
use ridevis_rs::config::LinkConfig;
use ridevis_rs::types::ConnectionStatus;
use serial_test::serial;

struct Harness {
    listener: TcpListener,
    handle: LinkHandle,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start(enabled: bool) -> Self {
        Self::with_capacity(enabled, LinkConfig::default().channel_capacity)
    }

    fn with_capacity(enabled: bool, channel_capacity: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let config = LinkConfig {
            enabled,
            host: "127.0.0.1".to_string(),
            port,
            reconnect_delay_ms: 50,
            channel_capacity,
            ..Default::default()
        };
        let (backend, handle) = LiveBackend::new(config);
        let thread = backend.spawn().expect("spawn link thread");
        Self {
            listener,
            handle,
            thread: Some(thread),
        }
    }

    fn accept(&self) -> TcpStream {
        let (stream, _) = self.listener.accept().expect("accept");
        stream
    }

    fn next_event(&self) -> LinkEvent {
        self.handle
            .receiver
            .recv_timeout(test_timeout())
            .expect("link event before timeout")
    }

    /// Skip events until the given status arrives
    fn wait_status(&self, status: ConnectionStatus) {
        loop {
            if self.next_event() == LinkEvent::Status(status) {
                return;
            }
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn send_line(stream: &mut TcpStream, line: &str) {
    stream.write_all(line.as_bytes()).expect("write line");
    stream.write_all(b"\n").expect("write newline");
    stream.flush().expect("flush");
}

#[test]
#[serial]
fn test_states_arrive_in_order() {
    let harness = Harness::start(true);
    let mut server = harness.accept();

    assert_eq!(harness.next_event(), LinkEvent::Status(ConnectionStatus::Connecting));
    assert_eq!(harness.next_event(), LinkEvent::Status(ConnectionStatus::Connected));

    send_line(&mut server, r#"{"type":"state","squatPct":10,"leanDeg":1,"torsoRot":0,"pitch":0,"roll":0}"#);
    send_line(&mut server, "this is not json");
    send_line(&mut server, "");
    send_line(&mut server, r#"{"type":"teleport","x":1}"#);
    send_line(&mut server, r#"{"type":"state","squatPct":20,"leanDeg":2,"torsoRot":0,"pitch":0,"roll":0,"boardConnected":true}"#);
    send_line(&mut server, r#"{"type":"config","ranges":{"maxLeanDeg":22},"isGoofy":false}"#);

    let LinkEvent::State(first) = harness.next_event() else {
        panic!("expected first state");
    };
    assert_eq!(first.squat_pct, 10.0);

    let LinkEvent::State(second) = harness.next_event() else {
        panic!("malformed lines should be skipped");
    };
    assert_eq!(second.lean_deg, 2.0);
    assert_eq!(second.board_connected, Some(true));

    let LinkEvent::Config(config) = harness.next_event() else {
        panic!("expected config");
    };
    assert_eq!(config.is_goofy, Some(false));
    assert_eq!(config.ranges.and_then(|r| r.max_lean_deg), Some(22.0));
}

#[test]
#[serial]
fn test_requests_are_written_as_lines() {
    let harness = Harness::start(true);
    let server = harness.accept();
    harness.wait_status(ConnectionStatus::Connected);

    assert!(harness.handle.send_request(LinkRequest::ListSessions));
    assert!(harness.handle.send_request(LinkRequest::SetStance { is_goofy: true }));

    let mut reader = BufReader::new(server);
    let mut line = String::new();
    reader.read_line(&mut line).expect("read request");
    assert_eq!(line, "{\"action\":\"list_sessions\"}\n");

    line.clear();
    reader.read_line(&mut line).expect("read request");
    assert_eq!(
        wire::decode_request(&line).expect("decode"),
        LinkRequest::SetStance { is_goofy: true }
    );
    assert!(line.contains("\"isGoofy\":true"));
}

#[test]
#[serial]
fn test_session_payload_round_trip() {
    let harness = Harness::start(true);
    let mut server = harness.accept();
    harness.wait_status(ConnectionStatus::Connected);

    let session = SessionBuilder::new("from server")
        .leans(&[(10.0, 3.0), (20.0, -3.0), (15.0, 0.0)])
        .build();
    let line = encode_line(&InboundMessage::SessionData {
        session: Box::new(session.clone()),
        id: Some("abc".to_string()),
    })
    .expect("encode");
    server.write_all(line.as_bytes()).expect("write");

    let LinkEvent::SessionData { session: received, id } = harness.next_event() else {
        panic!("expected session data");
    };
    assert_eq!(id.as_deref(), Some("abc"));
    assert_eq!(*received, session);
}

#[test]
#[serial]
fn test_reconnects_after_server_closes() {
    let harness = Harness::start(true);
    let server = harness.accept();
    harness.wait_status(ConnectionStatus::Connected);

    drop(server);
    harness.wait_status(ConnectionStatus::Disconnected);

    let mut server = harness.accept();
    harness.wait_status(ConnectionStatus::Connected);

    send_line(&mut server, r#"{"type":"session_saved","id":"new"}"#);
    assert_eq!(
        harness.next_event(),
        LinkEvent::SessionSaved { id: Some("new".to_string()) }
    );
}

#[test]
#[serial]
fn test_disabled_link_waits_for_connect() {
    let harness = Harness::start(false);
    harness
        .listener
        .set_nonblocking(true)
        .expect("nonblocking listener");

    // Requests while idle are dropped without a connection attempt
    assert!(harness.handle.send_request(LinkRequest::Calibrate));
    std::thread::sleep(std::time::Duration::from_millis(100));
    assert!(harness.listener.accept().is_err());
    assert!(harness.handle.try_recv().is_none());

    harness.handle.connect();
    let server = common::wait_for(test_timeout(), || harness.listener.accept().ok());
    assert!(server.is_some(), "link should connect after a connect command");
    harness.wait_status(ConnectionStatus::Connected);
}

#[test]
#[serial]
fn test_full_channel_keeps_status_and_replies() {
    let harness = Harness::with_capacity(true, 4);
    let mut server = harness.accept();

    for i in 0..10 {
        send_line(
            &mut server,
            &format!(r#"{{"type":"state","squatPct":{},"leanDeg":0,"torsoRot":0,"pitch":0,"roll":0}}"#, i),
        );
    }
    send_line(&mut server, r#"{"type":"session_saved","id":"kept"}"#);
    drop(server);

    // Let the worker run into the full channel before draining
    std::thread::sleep(std::time::Duration::from_millis(200));

    let mut saved = false;
    loop {
        match harness.next_event() {
            LinkEvent::SessionSaved { id } => {
                assert_eq!(id.as_deref(), Some("kept"));
                saved = true;
            }
            LinkEvent::Status(ConnectionStatus::Disconnected) => break,
            _ => {}
        }
    }

    assert!(saved, "session reply lost behind state samples");
}
