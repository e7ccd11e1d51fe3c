use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unrecognized arguments")]
    Usage,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load certificate and/or key: {0}")]
    CertLoad(String),

    #[error("certificate parse error: {0}")]
    CertParse(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("failed to connect to backend {addr}: {source}")]
    BackendDial {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
