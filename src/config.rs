use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_BACKEND_HOST: &str = "localhost";
pub const DEFAULT_CERT_PATH: &str = "./cert.pem";
pub const DEFAULT_KEY_PATH: &str = "./key.pem";

const PROGRAM: &str = "tls-relay";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub backend_addr: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Config {
    /// Resolve the configuration from raw process arguments, program name first.
    ///
    /// Accepted shapes are `listen backend`, `listen backend host` and
    /// `listen backend host cert key`. Anything else is `Error::Usage`.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();

        let (backend_host, cert_path, key_path) = match args.len() {
            3 => (DEFAULT_BACKEND_HOST, DEFAULT_CERT_PATH, DEFAULT_KEY_PATH),
            4 => (args[3].as_str(), DEFAULT_CERT_PATH, DEFAULT_KEY_PATH),
            6 => (args[3].as_str(), args[4].as_str(), args[5].as_str()),
            _ => return Err(Error::Usage),
        };

        let backend_port = parse_port(&args[2], "backend port")?;
        let listen_port = parse_port(&args[1], "listen port")?;
        let log_format = parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?;

        Ok(Config {
            listen_port,
            backend_addr: format!("{backend_host}:{backend_port}"),
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
            log_format,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }
}

pub fn usage() -> String {
    format!(
        "usage: {PROGRAM} listen-port backend-port [ backend-host [ cert-path key-path ] ]\n\
         e.g. {PROGRAM} 8080 8000\n\
         e.g. {PROGRAM} 443 80 www.example.com\n\
         e.g. {PROGRAM} 443 80 www.example.com cert/cert.pem cert/key.pem"
    )
}

fn parse_port(raw: &str, field: &str) -> Result<u16> {
    match raw.parse::<u16>() {
        Ok(0) => Err(Error::Config(format!("{field} must be greater than 0"))),
        Ok(port) => Ok(port),
        Err(e) => Err(Error::Config(format!("{field} is bad format '{raw}': {e}"))),
    }
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat> {
    match raw.unwrap_or("pretty").to_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        other => Err(Error::Config(format!(
            "invalid LOG_FORMAT '{other}': must be 'json' or 'pretty'"
        ))),
    }
}
