use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// PEM-encoded certificate chain and private key as read from disk.
#[derive(Debug, Clone)]
pub struct CertBundle {
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}

/// Location of the server certificate and key files.
#[derive(Debug, Clone)]
pub struct CertStore {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl CertStore {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub async fn read(&self) -> Result<CertBundle> {
        let certificate = read_pem(&self.cert_path, "certificate").await?;
        let private_key = read_pem(&self.key_path, "key").await?;

        debug!(
            cert = %self.cert_path.display(),
            key = %self.key_path.display(),
            "certificate files read"
        );
        Ok(CertBundle {
            certificate,
            private_key,
        })
    }
}

async fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path)
        .await
        .map_err(|e| Error::CertLoad(format!("cannot read {what} file '{}': {e}", path.display())))
}
