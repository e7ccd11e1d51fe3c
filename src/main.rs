use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tls_relay::cert::{self, CertStore};
use tls_relay::config::{self, Config, LogFormat};
use tls_relay::proxy::tls_acceptor;
use tls_relay::{Error, Result};

#[tokio::main]
async fn main() {
    let config = match Config::from_args(std::env::args()) {
        Ok(c) => c,
        Err(Error::Usage) => {
            println!("{}", config::usage());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.log_format);
    info!(
        listen = %config.listen_addr(),
        backend = %config.backend_addr,
        cert = %config.cert_path.display(),
        "tls-relay starting"
    );

    tokio::select! {
        result = run(config) => {
            if let Err(e) = result {
                error!(error = %e, "tls-relay exited with error");
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, stopping");
        }
    }
}

async fn run(config: Config) -> Result<()> {
    // The certificate must load before anything is bound.
    let store = CertStore::new(&config.cert_path, &config.key_path);
    let server_config = cert::load_server_config(&store).await?;

    let backend_addr: Arc<str> = Arc::from(config.backend_addr.as_str());
    tls_acceptor::run(config.listen_addr(), backend_addr, server_config).await
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
    }
}

fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
