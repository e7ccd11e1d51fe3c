pub mod fault;
pub mod forwarder;
pub mod relay;
pub mod tls_acceptor;
