//! TLS-terminating TCP relay.
//!
//! Accepts TLS connections, dials a fixed plaintext backend for each one and
//! copies bytes between the two sockets in both directions until either side
//! closes.

pub mod cert;
pub mod config;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
