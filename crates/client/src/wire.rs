//! Beacon wire client
//!
//! Sends newline-terminated beacon lines to the listener and reads the
//! one-line `ACK`/`NACK` reply for each.

use std::net::SocketAddr;

use tagwatch_protocol::Ack;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{ClientError, Result};

/// Line ending style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix style (LF)
    #[default]
    Lf,
    /// Windows style (CRLF)
    CrLf,
}

impl LineEnding {
    fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

/// Beacon wire client
///
/// `send` is lockstep: one line out, one reply in. `send_line` and
/// `read_response` may be used separately to pipeline.
///
/// # Example
///
/// ```ignore
/// use tagwatch_client::BeaconClient;
///
/// let mut client = BeaconClient::connect("127.0.0.1:8888").await?;
/// let ack = client.send("TAG,fa451f0755d8,197,20251003140059.456").await?;
/// assert!(ack.is_ack());
/// client.close().await?;
/// ```
pub struct BeaconClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line_ending: LineEnding,
    reply: String,
}

impl BeaconClient {
    /// Connect to a beacon listener
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection fails.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            line_ending: LineEnding::Lf,
            reply: String::with_capacity(8),
        })
    }

    /// Set line ending style
    #[must_use]
    pub fn with_line_ending(mut self, ending: LineEnding) -> Self {
        self.line_ending = ending;
        self
    }

    /// Write one line, appending the configured line ending
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(self.line_ending.as_bytes()).await?;
        Ok(())
    }

    /// Write raw bytes as-is
    ///
    /// For exercising the listener with malformed input.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).await?;
        Ok(())
    }

    /// Read the next reply line
    ///
    /// # Errors
    ///
    /// [`ClientError::ConnectionClosed`] on EOF, [`ClientError::Protocol`] if
    /// the line is neither `ACK` nor `NACK`.
    pub async fn read_response(&mut self) -> Result<Ack> {
        self.reply.clear();
        let n = self.reader.read_line(&mut self.reply).await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(self.reply.parse()?)
    }

    /// Send one line and wait for its reply
    pub async fn send(&mut self, line: &str) -> Result<Ack> {
        self.send_line(line).await?;
        self.read_response().await
    }

    /// Flush the write half
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Shut down the write half, keeping replies readable
    ///
    /// The listener sees EOF after any pipelined lines.
    pub async fn finish(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Close the connection gracefully
    pub async fn close(mut self) -> Result<()> {
        self.finish().await
    }

    /// Get the local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.local_addr()?)
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.peer_addr()?)
    }
}
