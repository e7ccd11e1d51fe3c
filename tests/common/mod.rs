//! Shared harness for relay integration tests: a self-signed identity,
//! an in-process relay on an ephemeral port, and small plaintext backends.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use tls_relay::cert::build_server_config;
use tls_relay::proxy::tls_acceptor;

pub const WAIT: Duration = Duration::from_secs(10);

pub struct TestIdentity {
    pub server_config: Arc<ServerConfig>,
    pub connector: TlsConnector,
}

impl TestIdentity {
    pub fn generate() -> Self {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = cert.cert.pem();
        let key_pem = cert.key_pair.serialize_pem();

        let server_config = build_server_config(cert_pem.as_bytes(), key_pem.as_bytes()).unwrap();

        let mut roots = RootCertStore::empty();
        roots.add(cert.cert.der().clone()).unwrap();
        let client_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            server_config: Arc::new(server_config),
            connector: TlsConnector::from(Arc::new(client_config)),
        }
    }
}

pub struct Relay {
    pub addr: SocketAddr,
    connector: TlsConnector,
}

impl Relay {
    /// Start a relay on an ephemeral loopback port in front of `backend`.
    pub async fn start(backend: SocketAddr) -> Self {
        let identity = TestIdentity::generate();
        let listener = tls_acceptor::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let backend_addr: Arc<str> = Arc::from(backend.to_string().as_str());
        tokio::spawn(tls_acceptor::serve(
            listener,
            backend_addr,
            identity.server_config.clone(),
        ));

        Self {
            addr,
            connector: identity.connector,
        }
    }

    pub async fn connect(&self) -> TlsStream<TcpStream> {
        let tcp = TcpStream::connect(self.addr).await.unwrap();
        let domain = ServerName::try_from("localhost").unwrap();
        self.connector.connect(domain, tcp).await.unwrap()
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Echo every byte back. A connection whose first byte is `b'!'` is reset
/// instead.
pub async fn spawn_echo_backend() -> io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let mut first = true;
                loop {
                    let n = match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    if first && buf[0] == b'!' {
                        let _ = stream.set_linger(Some(Duration::ZERO));
                        break;
                    }
                    first = false;
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    Ok(addr)
}

/// Read one request, answer with `response`, then close.
pub async fn spawn_oneshot_backend(response: &'static [u8]) -> io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1024];
                if stream.read(&mut buf).await.is_ok() {
                    let _ = stream.write_all(response).await;
                }
            });
        }
    });

    Ok(addr)
}

/// Swallow everything and report how many bytes arrived before EOF.
pub async fn spawn_sink_backend() -> io::Result<(SocketAddr, mpsc::UnboundedReceiver<usize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let mut total = 0;
                while let Ok(n) = stream.read(&mut buf).await {
                    if n == 0 {
                        let _ = tx.send(total);
                        break;
                    }
                    total += n;
                }
            });
        }
    });

    Ok((addr, rx))
}

/// Send `greeting`, half-close, then report what the next read observes.
pub async fn spawn_half_close_backend(
    greeting: &'static [u8],
) -> io::Result<(SocketAddr, mpsc::UnboundedReceiver<io::Result<usize>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if stream.write_all(greeting).await.is_err() || stream.shutdown().await.is_err() {
                    return;
                }
                let mut buf = [0u8; 64];
                let _ = tx.send(stream.read(&mut buf).await);
            });
        }
    });

    Ok((addr, rx))
}
