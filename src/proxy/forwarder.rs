use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::proxy::fault;
use crate::proxy::relay::{relay, Direction, SourceSocket};

/// Pair a TLS-terminated client connection with a fresh backend connection.
///
/// On success two detached relay tasks are started, one per direction, and
/// this returns immediately without tracking them. If the backend cannot be
/// reached the client is closed here and no relay is started.
pub async fn forward(
    client: TlsStream<TcpStream>,
    peer: SocketAddr,
    backend_addr: Arc<str>,
) -> Result<()> {
    let client_socket = match SourceSocket::of(client.get_ref().0) {
        Ok(socket) => socket,
        Err(e) => {
            close(client).await;
            return Err(e.into());
        }
    };

    let backend = match TcpStream::connect(&*backend_addr).await {
        Ok(stream) => stream,
        Err(source) => {
            close(client).await;
            return Err(Error::BackendDial {
                addr: backend_addr.to_string(),
                source,
            });
        }
    };

    if let Err(e) = backend.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY on backend socket");
    }
    // Dropping `backend` on this path closes it along with the client.
    let backend_socket = match SourceSocket::of(&backend) {
        Ok(socket) => socket,
        Err(e) => {
            close(client).await;
            return Err(e.into());
        }
    };
    debug!(peer = %peer, backend = %backend_addr, "backend connected");

    let (client_read, client_write) = split(client);
    let (backend_read, backend_write) = backend.into_split();

    spawn_relay(
        client_read,
        backend_write,
        client_socket,
        Direction::ClientToBackend,
        peer,
    );
    spawn_relay(
        backend_read,
        client_write,
        backend_socket,
        Direction::BackendToClient,
        peer,
    );

    Ok(())
}

fn spawn_relay<R, W>(
    reader: R,
    writer: W,
    source: SourceSocket,
    direction: Direction,
    peer: SocketAddr,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fault::spawn_guarded(direction, async move {
        match relay(reader, writer, source, direction).await {
            Ok(bytes) => debug!(peer = %peer, %direction, bytes, "relay finished"),
            Err(e) => debug!(peer = %peer, %direction, error = %e, "relay write failed"),
        }
    });
}

async fn close<S>(mut client: S)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = client.shutdown().await {
        debug!(error = %e, "client shutdown failed");
    }
}
