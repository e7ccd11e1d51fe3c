use std::fmt;
use std::io;
use std::net::Shutdown;

use socket2::{SockRef, Socket};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::Result;

/// Size of the per-direction copy buffer.
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Which way a relay task moves bytes. Only used to tag diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client",
            Direction::BackendToClient => "server",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closes, in both directions, the socket a relay reads from.
pub trait CloseSource {
    fn close(&self) -> io::Result<()>;
}

/// Separate handle on a TCP socket that outlives the split halves.
///
/// Shutting it down affects the shared socket, so the opposite relay's
/// writes into it fail and the remote peer sees the connection close.
pub struct SourceSocket(Socket);

impl SourceSocket {
    pub fn of(stream: &TcpStream) -> io::Result<Self> {
        SockRef::from(stream).try_clone().map(Self)
    }
}

impl CloseSource for SourceSocket {
    fn close(&self) -> io::Result<()> {
        self.0.shutdown(Shutdown::Both)
    }
}

impl Drop for SourceSocket {
    // Covers a relay that unwinds before reaching its explicit close.
    fn drop(&mut self) {
        let _ = self.0.shutdown(Shutdown::Both);
    }
}

/// Copy bytes from `reader` to `writer` until end-of-stream or a read error.
///
/// Bytes are forwarded unmodified and in order. A read error ends the relay
/// like EOF does, after being logged. A write error ends it too and is
/// returned to the caller.
///
/// On every exit path the socket behind `reader` is closed through `source`;
/// this is what eventually starves the opposite direction. The destination
/// only gets a write shutdown (FIN or close_notify), never a full close.
pub async fn relay<R, W, C>(
    mut reader: R,
    mut writer: W,
    source: C,
    direction: Direction,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: CloseSource,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    let outcome = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break Ok(total),
            Ok(n) => n,
            Err(e) => {
                warn!(%direction, error = %e, "read error");
                break Ok(total);
            }
        };

        if let Err(e) = write_chunk(&mut writer, &buf[..n]).await {
            break Err(e.into());
        }
        total += n as u64;
    };

    drop(reader);
    if let Err(e) = writer.shutdown().await {
        debug!(%direction, error = %e, "shutdown of destination failed");
    }
    // Already closed by the peer or by a reset is fine.
    if let Err(e) = source.close() {
        debug!(%direction, error = %e, "close of source failed");
    }

    outcome
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}
