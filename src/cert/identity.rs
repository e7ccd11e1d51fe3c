use std::sync::Arc;

use rustls::ServerConfig;
use tracing::info;

use crate::cert::store::CertStore;
use crate::error::{Error, Result};

/// Read the certificate and key from `store` and build the server identity.
pub async fn load_server_config(store: &CertStore) -> Result<Arc<ServerConfig>> {
    let bundle = store.read().await?;
    let config = build_server_config(&bundle.certificate, &bundle.private_key)?;

    info!(
        cert = %store.cert_path().display(),
        key = %store.key_path().display(),
        "server certificate loaded"
    );
    Ok(Arc::new(config))
}

/// Parse PEM certificate chain and private key, then build a rustls ServerConfig.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<ServerConfig> {
    let certs = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::CertParse(format!("failed to parse certificate PEM: {e}")))?;

    if certs.is_empty() {
        return Err(Error::CertParse("no certificates found in PEM".into()));
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| Error::CertParse(format!("failed to parse private key PEM: {e}")))?
        .ok_or_else(|| Error::CertParse("no private key found in PEM".into()))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(format!("failed to build TLS server config: {e}")))?;

    Ok(config)
}
