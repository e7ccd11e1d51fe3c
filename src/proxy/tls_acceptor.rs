use std::net::SocketAddr;
use std::sync::Arc;

use rustls::ServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::proxy::{fault, forwarder};

/// Bind the listening socket. Failure here is fatal to the caller.
pub async fn bind(listen_addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(listen_addr)
        .await
        .map_err(|source| Error::Bind {
            addr: listen_addr,
            source,
        })
}

/// Bind `listen_addr` and serve TLS connections on it forever.
pub async fn run(
    listen_addr: SocketAddr,
    backend_addr: Arc<str>,
    server_config: Arc<ServerConfig>,
) -> Result<()> {
    let listener = bind(listen_addr).await?;
    serve(listener, backend_addr, server_config).await
}

/// Run the accept loop on an already bound listener.
///
/// Each connection is handed to its own detached task, so the loop never
/// waits on a handshake, a backend dial, or relay traffic. Only an accept
/// error ends the loop, and it is returned as fatal.
pub async fn serve(
    listener: TcpListener,
    backend_addr: Arc<str>,
    server_config: Arc<ServerConfig>,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(server_config);
    info!(addr = %listener.local_addr()?, backend = %backend_addr, "TLS relay listening");

    loop {
        let (tcp_stream, peer_addr) = listener.accept().await.map_err(Error::Accept)?;
        info!(peer = %peer_addr, "access from client");

        let acceptor = acceptor.clone();
        let backend = backend_addr.clone();
        fault::spawn_guarded(format!("connection {peer_addr}"), async move {
            handle(acceptor, tcp_stream, peer_addr, backend).await;
        });
    }
}

async fn handle(
    acceptor: TlsAcceptor,
    tcp_stream: TcpStream,
    peer_addr: SocketAddr,
    backend_addr: Arc<str>,
) {
    if let Err(e) = tcp_stream.set_nodelay(true) {
        debug!(peer = %peer_addr, error = %e, "failed to set TCP_NODELAY on client socket");
    }

    let tls_stream = match acceptor.accept(tcp_stream).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(peer = %peer_addr, error = %e, "TLS handshake failed");
            return;
        }
    };

    if let Err(e) = forwarder::forward(tls_stream, peer_addr, backend_addr).await {
        warn!(peer = %peer_addr, error = %e, "failed to access backend");
    }
}
