//! Beacon TCP Source
//!
//! Line-oriented beacon receiver. Every non-blank line is parsed, accepted
//! beacons are handed to the tag store, and the line is answered with `ACK`
//! or `NACK` on the same connection.
//!
//! # Framing
//!
//! Newline-delimited, LF or CRLF. Lines longer than `max_line_length` are
//! consumed up to their newline and answered with `NACK`. A final line with
//! no terminator is still processed when the peer closes the stream.
//!
//! # Acknowledgements
//!
//! | Line | Reply |
//! |------|-------|
//! | blank | none |
//! | parse rejected, over-long, not UTF-8 | `NACK` |
//! | parsed (registered or not, changed or not) | `ACK` |
//! | parsed, store failed | `ACK` (error logged and counted) |
//!
//! # Shutdown
//!
//! On cancellation the listening socket is dropped, handlers stop at their
//! next read, and survivors are aborted after `grace_period`.
//!
//! # Example
//!
//! ```ignore
//! let config = ListenerConfig {
//!     address: "0.0.0.0".into(),
//!     port: 8888,
//!     ..Default::default()
//! };
//!
//! let source = BeaconTcpSource::new(config, parser, store);
//! source.run(cancel).await?;
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use socket2::{SockRef, TcpKeepalive};
use tagwatch_protocol::{Ack, BeaconParser, DEFAULT_MAX_LINE_LENGTH};
use tagwatch_store::TagStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::common::{MetricsSnapshot, SourceMetrics};

// =============================================================================
// Constants
// =============================================================================

/// Default beacon port
const DEFAULT_PORT: u16 = 8888;

/// Connections stay open until the peer closes them
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::ZERO;

/// Default time allowed for connections to finish on shutdown
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Read buffer per connection
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Keepalive probe interval
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Beacon listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub address: String,

    /// Listen port (0 = OS assigned)
    pub port: u16,

    /// Longest accepted line in bytes, terminator excluded
    pub max_line_length: usize,

    /// Close a connection after this long without a complete line (0 = never)
    pub idle_timeout: Duration,

    /// Simultaneous connection cap (0 = unbounded)
    pub max_connections: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// Time connections get to finish after cancellation
    pub grace_period: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_connections: 0,
            nodelay: true,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl ListenerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Beacon listener metrics
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Connection and byte counters
    pub base: SourceMetrics,

    /// Non-blank lines read
    pub lines_read: AtomicU64,

    /// `ACK` replies written
    pub acks: AtomicU64,

    /// `NACK` replies written
    pub nacks: AtomicU64,

    /// Beacons that changed a tag's counter
    pub beacons_changed: AtomicU64,

    /// Beacons that left the counter unchanged or were for unregistered tags
    pub beacons_unchanged: AtomicU64,

    /// Store failures during ingest
    pub store_errors: AtomicU64,
}

impl ListenerMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            base: SourceMetrics::new(),
            lines_read: AtomicU64::new(0),
            acks: AtomicU64::new(0),
            nacks: AtomicU64::new(0),
            beacons_changed: AtomicU64::new(0),
            beacons_unchanged: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn replied(&self, ack: Ack) {
        let counter = if ack.is_ack() { &self.acks } else { &self.nacks };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn ingested(&self, changed: bool) {
        let counter = if changed {
            &self.beacons_changed
        } else {
            &self.beacons_unchanged
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
        self.base.error();
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ListenerMetricsSnapshot {
        ListenerMetricsSnapshot {
            connections: self.base.snapshot(),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            acks: self.acks.load(Ordering::Relaxed),
            nacks: self.nacks.load(Ordering::Relaxed),
            beacons_changed: self.beacons_changed.load(Ordering::Relaxed),
            beacons_unchanged: self.beacons_unchanged.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time listener metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListenerMetricsSnapshot {
    #[serde(flatten)]
    pub connections: MetricsSnapshot,
    pub lines_read: u64,
    pub acks: u64,
    pub nacks: u64,
    pub beacons_changed: u64,
    pub beacons_unchanged: u64,
    pub store_errors: u64,
}

// =============================================================================
// Errors
// =============================================================================

/// Beacon listener errors
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Source Implementation
// =============================================================================

/// Beacon TCP source
///
/// Holds no tag state of its own; it adapts the socket to the shared parser
/// and store.
pub struct BeaconTcpSource {
    config: ListenerConfig,
    parser: Arc<BeaconParser>,
    store: Arc<TagStore>,
    metrics: Arc<ListenerMetrics>,
    running: Arc<AtomicBool>,
}

impl BeaconTcpSource {
    /// Create a new beacon source
    pub fn new(config: ListenerConfig, parser: Arc<BeaconParser>, store: Arc<TagStore>) -> Self {
        Self {
            config,
            parser,
            store,
            metrics: Arc::new(ListenerMetrics::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<ListenerMetrics> {
        &self.metrics
    }

    /// Whether the accept loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener, ListenerError> {
        let bind_addr = self.config.bind_address();

        TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ListenerError::Bind {
                address: bind_addr,
                source: e,
            })
    }

    /// Run the source (main entry point)
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ListenerError> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await
    }

    /// Accept connections on an already bound listener until cancelled
    pub async fn serve(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), ListenerError> {
        let local_addr = listener.local_addr()?;
        self.running.store(true, Ordering::Relaxed);

        tracing::info!(
            address = %local_addr,
            mode = self.parser.mode().as_str(),
            max_line_length = self.config.max_line_length,
            max_connections = self.config.max_connections,
            "beacon listener started"
        );

        let connections = self.accept_loop(listener, &cancel).await;
        self.running.store(false, Ordering::Relaxed);

        self.drain(connections).await;

        tracing::info!(address = %local_addr, "beacon listener stopped");
        Ok(())
    }

    /// Accept until cancelled; the listener is dropped on return
    async fn accept_loop(&self, listener: TcpListener, cancel: &CancellationToken) -> JoinSet<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        tracing::error!(error = %e, "beacon connection task panicked");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            self.admit(&mut connections, stream, peer_addr, cancel);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "beacon accept error");
                            self.metrics.base.error();
                        }
                    }
                }
            }
        }

        connections
    }

    fn admit(
        &self,
        connections: &mut JoinSet<()>,
        stream: TcpStream,
        peer_addr: SocketAddr,
        cancel: &CancellationToken,
    ) {
        let max = self.config.max_connections;
        if max > 0 && self.metrics.base.active() >= max as u64 {
            self.metrics.base.connection_rejected();
            tracing::warn!(peer = %peer_addr, max_connections = max, "connection limit reached, closing");
            drop(stream);
            return;
        }

        self.metrics.base.connection_opened();
        self.configure_socket(&stream);

        let handler = ConnectionHandler {
            max_line_length: self.config.max_line_length,
            idle_timeout: self.config.idle_timeout,
            parser: Arc::clone(&self.parser),
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
            cancel: cancel.clone(),
            peer_addr,
        };
        let metrics = Arc::clone(&self.metrics);

        connections.spawn(async move {
            tracing::debug!(peer = %peer_addr, "beacon connection opened");
            if let Err(e) = handler.handle(stream).await {
                tracing::debug!(peer = %peer_addr, error = %e, "beacon connection error");
            }
            metrics.base.connection_closed();
            tracing::debug!(peer = %peer_addr, "beacon connection closed");
        });
    }

    /// Wait for open connections, aborting them after the grace period
    async fn drain(&self, mut connections: JoinSet<()>) {
        if connections.is_empty() {
            return;
        }

        tracing::info!(
            connections = connections.len(),
            grace_period = ?self.config.grace_period,
            "waiting for beacon connections to finish"
        );

        let finished = tokio::time::timeout(self.config.grace_period, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if finished.is_err() {
            tracing::warn!(
                connections = connections.len(),
                "grace period elapsed, aborting beacon connections"
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
    }

    /// Apply nodelay and keepalive to an accepted socket
    fn configure_socket(&self, stream: &TcpStream) {
        let socket = SockRef::from(stream);

        if self.config.nodelay
            && let Err(e) = socket.set_tcp_nodelay(true)
        {
            tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
        }

        let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            tracing::warn!(error = %e, "Failed to set TCP keepalive");
        }
    }
}

// =============================================================================
// Connection Handler
// =============================================================================

/// Handles a single beacon connection
struct ConnectionHandler {
    max_line_length: usize,
    idle_timeout: Duration,
    parser: Arc<BeaconParser>,
    store: Arc<TagStore>,
    metrics: Arc<ListenerMetrics>,
    cancel: CancellationToken,
    peer_addr: SocketAddr,
}

impl ConnectionHandler {
    /// Handle the connection until EOF, error, idle timeout or cancellation
    async fn handle(self, stream: TcpStream) -> Result<(), ListenerError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, read_half);

        // Line buffer (reused across reads), bounded to max_line_length
        let mut line_buf = Vec::with_capacity(self.max_line_length.min(READ_BUFFER_SIZE));

        let timeout = (!self.idle_timeout.is_zero()).then_some(self.idle_timeout);

        loop {
            let read_result = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                read_result = async {
                    match timeout {
                        Some(limit) => tokio::time::timeout(
                            limit,
                            read_bounded_line(&mut reader, &mut line_buf, self.max_line_length),
                        )
                        .await,
                        None => Ok(read_bounded_line(&mut reader, &mut line_buf, self.max_line_length).await),
                    }
                } => read_result,
            };

            let ack = match read_result {
                Ok(Ok(ReadLineResult::Line(bytes_read))) => {
                    self.metrics.base.bytes_read(bytes_read as u64);
                    match self.process_line(trim_line_ending(&line_buf)).await {
                        Some(ack) => ack,
                        None => continue,
                    }
                }
                Ok(Ok(ReadLineResult::TooLong(bytes_read))) => {
                    self.metrics.base.bytes_read(bytes_read as u64);
                    self.metrics.line_read();
                    tracing::debug!(
                        peer = %self.peer_addr,
                        max = self.max_line_length,
                        "beacon line too long"
                    );
                    Ack::Nack
                }
                Ok(Ok(ReadLineResult::Eof)) => break,
                Ok(Err(e)) => {
                    if !is_connection_reset(&e) {
                        self.metrics.base.error();
                        tracing::debug!(peer = %self.peer_addr, error = %e, "beacon read error");
                    }
                    break;
                }
                Err(_) => {
                    tracing::debug!(peer = %self.peer_addr, "beacon connection idle timeout");
                    break;
                }
            };

            if let Err(e) = self.reply(&mut writer, ack).await {
                if !is_connection_reset(&e) {
                    self.metrics.base.error();
                }
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Parse and ingest one line; `None` for blank lines
    async fn process_line(&self, line: &[u8]) -> Option<Ack> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        self.metrics.line_read();

        let Ok(text) = std::str::from_utf8(line) else {
            tracing::debug!(peer = %self.peer_addr, "beacon line is not valid UTF-8");
            return Some(Ack::Nack);
        };

        let beacon = match self.parser.parse(text) {
            Ok(beacon) => beacon,
            Err(_) => return Some(Ack::Nack),
        };

        match self
            .store
            .ingest(&beacon.tag_id, beacon.cnt, &beacon.timestamp)
            .await
        {
            Ok(changed) => self.metrics.ingested(changed),
            Err(e) => {
                self.metrics.store_error();
                tracing::error!(
                    peer = %self.peer_addr,
                    tag_id = %beacon.tag_id,
                    cnt = beacon.cnt,
                    error = %e,
                    "failed to store beacon"
                );
            }
        }

        Some(Ack::Ack)
    }

    async fn reply(&self, writer: &mut OwnedWriteHalf, ack: Ack) -> io::Result<()> {
        writer.write_all(ack.as_bytes()).await?;
        self.metrics.replied(ack);
        Ok(())
    }
}

/// Strip a trailing LF or CRLF
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

// =============================================================================
// Bounded Line Reading
// =============================================================================

/// Result of reading a bounded line
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadLineResult {
    /// Line stored in the buffer (byte count including terminator)
    Line(usize),
    /// Line exceeded the limit and was consumed/discarded (bytes consumed)
    TooLong(usize),
    /// End of stream
    Eof,
}

/// Read a line with bounded memory allocation
///
/// - Reads until newline or EOF
/// - A line whose content exceeds `max_len` is consumed through its newline
///   and reported as `TooLong`
/// - A final line without newline is returned as `Line`
pub(crate) async fn read_bounded_line<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_len: usize,
) -> io::Result<ReadLineResult> {
    buf.clear();

    let mut total_bytes = 0;
    let mut exceeded_limit = false;

    loop {
        let available = reader.fill_buf().await?;

        if available.is_empty() {
            if total_bytes == 0 {
                return Ok(ReadLineResult::Eof);
            }
            break;
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let (bytes_to_consume, done) = match newline_pos {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        if !exceeded_limit {
            buf.extend_from_slice(&available[..bytes_to_consume]);
            if trim_line_ending(buf).len() > max_len
                || (!done && buf.len() > max_len.saturating_add(1))
            {
                exceeded_limit = true;
                buf.clear();
            }
        }

        total_bytes += bytes_to_consume;
        reader.consume(bytes_to_consume);

        if done {
            break;
        }
    }

    if exceeded_limit || trim_line_ending(buf).len() > max_len {
        buf.clear();
        return Ok(ReadLineResult::TooLong(total_bytes));
    }

    Ok(ReadLineResult::Line(total_bytes))
}

/// Check if error is a connection reset (expected when peers hang up)
pub(crate) fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
