//! Tests for the TCP Server
//!
//! These tests verify:
//! - Request/response loop over real sockets
//! - Admission control under max_connections
//! - Oversized reads, empty reads and empty responses
//! - Handler error mapping
//! - Idle timeouts and shutdown

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown as SocketShutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use memkv::network::{Handler, Semaphore, Server, Shutdown};
use memkv::{Config, KvError};

// =============================================================================
// Test Handler
// =============================================================================

/// Echoes requests, with a few reserved inputs for edge cases
struct TestHandler;

impl Handler for TestHandler {
    fn handle(&self, request: &str) -> memkv::Result<String> {
        match request {
            "silent" => Ok(String::new()),
            "fail-empty" => Err(KvError::Internal(String::new())),
            "fail" => Err(KvError::Network("boom".to_string())),
            other => Ok(format!("Response for {}", other)),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: Shutdown,
    slots: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    handle: Option<JoinHandle<memkv::Result<()>>>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let server = Server::bind(&config, TestHandler).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let slots = server.slots();
        let active = server.active_connections();
        let handle = thread::spawn(move || server.run());

        Self {
            addr,
            shutdown,
            slots,
            active,
            handle: Some(handle),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    fn stop(&mut self) -> memkv::Result<()> {
        self.shutdown.trigger();
        match self.handle.take() {
            Some(handle) => handle.join().unwrap(),
            None => Ok(()),
        }
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no connection is being served
    ///
    /// The accept loop keeps one permit while waiting for the next client,
    /// so an idle server has `capacity - 1` free slots.
    fn wait_for_idle(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.active() > 0 || self.slots.available() < self.slots.capacity() - 1 {
            assert!(Instant::now() < deadline, "connections were not released");
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Wait until the accept loop has taken its pending permit
    fn wait_for_pending_permit(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.slots.available() != self.slots.capacity() - 1 {
            assert!(Instant::now() < deadline, "accept loop never took its permit");
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn config(max_connections: usize, buffer: usize) -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(max_connections)
        .max_message_size(buffer)
        .build()
}

fn round_trip(stream: &mut TcpStream, request: &str) -> String {
    stream.write_all(request.as_bytes()).unwrap();
    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer).unwrap();
    String::from_utf8_lossy(&buffer[..n]).into_owned()
}

/// True when the peer has closed the connection (EOF or reset)
fn is_closed(stream: &mut TcpStream) -> bool {
    let mut buffer = [0u8; 64];
    match stream.read(&mut buffer) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted),
    }
}

// =============================================================================
// Request/Response Tests
// =============================================================================

#[test]
fn test_single_request() {
    let server = TestServer::start(config(2, 1024));
    let mut client = server.connect();

    assert_eq!(round_trip(&mut client, "client1"), "Response for client1");
}

#[test]
fn test_multiple_requests_same_connection() {
    let server = TestServer::start(config(1, 1024));
    let mut client = server.connect();

    for i in 0..5 {
        let request = format!("request-{}", i);
        assert_eq!(round_trip(&mut client, &request), format!("Response for {}", request));
    }
}

#[test]
fn test_bind_failure_is_reported() {
    let first = Server::bind(&config(1, 64), TestHandler).unwrap();
    let taken = Config::builder()
        .listen_addr(first.local_addr().to_string())
        .build();

    let err = Server::bind(&taken, TestHandler).err().unwrap();
    assert!(matches!(err, KvError::Network(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let err = Server::bind(&config(1, 0), TestHandler).err().unwrap();
    assert!(matches!(err, KvError::Config(_)));
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_read_filling_buffer_closes_connection() {
    let server = TestServer::start(config(1, 16));
    let mut client = server.connect();

    client.write_all(b"0123456789abcdef").unwrap();

    assert!(is_closed(&mut client));
    server.wait_for_idle();
}

#[test]
fn test_read_below_capacity_is_processed() {
    let server = TestServer::start(config(1, 16));
    let mut client = server.connect();

    assert_eq!(round_trip(&mut client, "0123456789abcde"), "Response for 0123456789abcde");
}

#[test]
fn test_empty_read_ends_connection_without_response() {
    let server = TestServer::start(config(1, 64));
    let mut client = server.connect();

    client.shutdown(SocketShutdown::Write).unwrap();

    let mut buffer = Vec::new();
    client.read_to_end(&mut buffer).unwrap();
    assert!(buffer.is_empty());
    server.wait_for_idle();
}

#[test]
fn test_empty_response_is_not_written() {
    let server = TestServer::start(config(1, 64));
    let mut client = server.connect();

    client.write_all(b"silent").unwrap();
    client.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buffer = [0u8; 64];
    let err = client.read(&mut buffer).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut));

    // The connection is still served
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(round_trip(&mut client, "ping"), "Response for ping");
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[test]
fn test_handler_error_message_is_sent() {
    let server = TestServer::start(config(1, 64));
    let mut client = server.connect();

    assert_eq!(round_trip(&mut client, "fail"), "Network error: boom");
    assert_eq!(round_trip(&mut client, "after"), "Response for after");
}

#[test]
fn test_handler_error_without_message() {
    let server = TestServer::start(config(1, 64));
    let mut client = server.connect();

    assert_eq!(round_trip(&mut client, "fail-empty"), "Internal error");
}

// =============================================================================
// Admission Control Tests
// =============================================================================

#[test]
fn test_third_connection_waits_for_free_slot() {
    let server = TestServer::start(config(2, 1024));

    let mut client1 = server.connect();
    let mut client2 = server.connect();
    assert_eq!(round_trip(&mut client1, "client1"), "Response for client1");
    assert_eq!(round_trip(&mut client2, "client2"), "Response for client2");
    assert_eq!(server.active(), 2);
    assert_eq!(server.slots.available(), 0);

    // The TCP handshake completes through the backlog, but the server does
    // not accept (and so never answers) until a slot frees up.
    let mut client3 = server.connect();
    client3.write_all(b"client3").unwrap();
    client3.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
    let mut buffer = [0u8; 1024];
    let err = client3.read(&mut buffer).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut));

    drop(client1);

    client3.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let n = client3.read(&mut buffer).unwrap();
    assert_eq!(&buffer[..n], b"Response for client3");

    // The remaining connection is unaffected
    assert_eq!(round_trip(&mut client2, "again"), "Response for again");
}

#[test]
fn test_zero_max_connections_allows_one() {
    let server = TestServer::start(config(0, 1024));
    assert_eq!(server.slots.capacity(), 1);

    let mut client = server.connect();
    assert_eq!(round_trip(&mut client, "only"), "Response for only");
}

#[test]
fn test_slots_released_after_disconnect() {
    let server = TestServer::start(config(2, 1024));

    for _ in 0..4 {
        let mut client = server.connect();
        assert_eq!(round_trip(&mut client, "x"), "Response for x");
    }

    server.wait_for_idle();
    server.wait_for_pending_permit();
    assert_eq!(server.active(), 0);
    assert_eq!(server.slots.available(), 1);
}

#[test]
fn test_idle_server_holds_one_pending_permit() {
    let server = TestServer::start(config(1, 1024));
    server.wait_for_pending_permit();
    assert_eq!(server.active(), 0);

    for i in 0..3 {
        let mut client = server.connect();
        let request = format!("r{}", i);
        assert_eq!(round_trip(&mut client, &request), format!("Response for {}", request));
        assert_eq!(server.active(), 1);
    }

    // Every connection released its slot: the single permit is back with
    // the accept loop and nothing is being served.
    server.wait_for_idle();
    server.wait_for_pending_permit();
    assert_eq!(server.active(), 0);
    assert_eq!(server.slots.available(), 0);
    assert_eq!(server.slots.capacity(), 1);

    let mut client = server.connect();
    assert_eq!(round_trip(&mut client, "again"), "Response for again");
}

// =============================================================================
// Timeout and Shutdown Tests
// =============================================================================

#[test]
fn test_idle_connection_is_closed() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .idle_timeout(Duration::from_millis(200))
        .build();
    let server = TestServer::start(config);
    let mut client = server.connect();

    assert_eq!(round_trip(&mut client, "hello"), "Response for hello");

    let started = Instant::now();
    assert!(is_closed(&mut client));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.wait_for_idle();
}

#[test]
fn test_shutdown_stops_accept_loop() {
    let mut server = TestServer::start(config(1, 64));
    let addr = server.addr;

    server.stop().unwrap();

    assert!(TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_err());
}

#[test]
fn test_shutdown_while_waiting_for_slot() {
    let mut server = TestServer::start(config(1, 64));
    let mut client = server.connect();
    assert_eq!(round_trip(&mut client, "busy"), "Response for busy");

    // The accept loop is blocked on the semaphore; shutdown must still stop it
    let started = Instant::now();
    server.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    // In-flight connections keep being served
    assert_eq!(round_trip(&mut client, "still"), "Response for still");
}
