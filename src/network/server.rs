//! TCP Server
//!
//! Accepts connections under an admission limit and hands each one to its
//! own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{KvError, Result};

use super::{Connection, Handler, Permit, Semaphore, Shutdown};

/// Sleep between polls of the non-blocking listener
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Back-off after an unexpected accept error
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server for memkv
pub struct Server<H> {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<H>,
    slots: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    shutdown: Shutdown,
    buffer_size: usize,
    idle_timeout: Option<Duration>,
    next_conn_id: u64,
}

impl<H: Handler> Server<H> {
    /// Bind the listener and prepare the server
    ///
    /// Fails if the config is invalid or the address cannot be bound.
    pub fn bind(config: &Config, handler: H) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Network(format!("failed to listen on {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            addr = %local_addr,
            max_connections = config.effective_max_connections(),
            buffer_size = config.max_message_size,
            idle_timeout = ?config.idle_timeout,
            "server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            handler: Arc::new(handler),
            slots: Semaphore::new(config.effective_max_connections()),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: Shutdown::new(),
            buffer_size: config.max_message_size,
            idle_timeout: config.idle_timeout,
            next_conn_id: 1,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal that stops `run` at its next check
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Admission semaphore
    ///
    /// While `run` is waiting for a connection the accept loop already holds
    /// one permit, so an idle server reports `capacity - 1` free slots. Use
    /// `active_connections` to count connections being served.
    pub fn slots(&self) -> Arc<Semaphore> {
        Arc::clone(&self.slots)
    }

    /// Live count of connections currently being served
    pub fn active_connections(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Run the accept loop (blocking) until shutdown is triggered
    ///
    /// The listener is closed on return. Connections already being served
    /// keep running until their own next I/O ends them.
    pub fn run(mut self) -> Result<()> {
        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let Some(permit) = self.slots.acquire_until(&self.shutdown) else {
                break;
            };

            let Some((stream, peer)) = self.accept() else {
                break;
            };

            self.spawn_connection(stream, peer, permit);
        }

        tracing::info!(addr = %self.local_addr, "server stopped accepting connections");
        Ok(())
    }

    /// Wait for the next connection; `None` once shutdown is triggered
    fn accept(&self) -> Option<(TcpStream, SocketAddr)> {
        loop {
            if self.shutdown.is_triggered() {
                return None;
            }

            match self.listener.accept() {
                Ok(accepted) => return Some(accepted),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!(error = %e, "listener accept error");
                    thread::sleep(ACCEPT_ERROR_BACKOFF);
                }
            }
        }
    }

    fn spawn_connection(&mut self, stream: TcpStream, peer: SocketAddr, permit: Permit) {
        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;

        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::error!(conn_id, peer = %peer, error = %e, "failed to configure connection");
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(conn_id, peer = %peer, error = %e, "failed to disable Nagle");
        }

        let active = ActiveConnection::register(&self.active, permit);
        let handler = Arc::clone(&self.handler);
        let buffer_size = self.buffer_size;
        let idle_timeout = self.idle_timeout;

        let spawned = thread::Builder::new()
            .name(format!("memkv-conn-{}", conn_id))
            .spawn(move || {
                // Released when the thread exits, whichever path it takes
                let _active = active;
                let span = tracing::info_span!("connection", conn_id, peer = %peer);
                let _enter = span.enter();

                let mut connection =
                    Connection::new(stream, conn_id, buffer_size, idle_timeout, handler);
                if let Err(e) = connection.handle() {
                    tracing::error!(error = %e, "connection closed with error");
                }
                tracing::info!("server closes connection");
            });

        if let Err(e) = spawned {
            tracing::error!(conn_id, peer = %peer, error = %e, "failed to spawn connection thread");
        }
    }
}

/// One served connection: counted in `active` and holding its admission slot
///
/// On drop the count is decremented first, then the permit is released, so
/// the count never exceeds the semaphore capacity.
struct ActiveConnection {
    counter: Arc<AtomicUsize>,
    _permit: Permit,
}

impl ActiveConnection {
    fn register(counter: &Arc<AtomicUsize>, permit: Permit) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
            _permit: permit,
        }
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
