//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::io;
use std::path::Path;

use crate::config::schema::TlsConfig;

fn require_file(path: &Path, what: &str) -> io::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found: {}", what, path.display()),
        ))
    }
}

/// Load the listener's PEM certificate chain and private key.
pub async fn load_tls_config(tls: &TlsConfig) -> io::Result<RustlsConfig> {
    let cert = Path::new(&tls.cert_path);
    let key = Path::new(&tls.key_path);
    require_file(cert, "Certificate file")?;
    require_file(key, "Private key file")?;

    let config = RustlsConfig::from_pem_file(cert, key).await?;
    tracing::info!(cert = %cert.display(), "TLS certificate loaded");
    Ok(config)
}
