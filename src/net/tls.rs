//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::path::Path;

use crate::config::SslConfig;

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Build the server TLS context when `ssl.enabled` is set.
pub async fn server_tls_context(ssl: &SslConfig) -> Result<Option<RustlsConfig>, std::io::Error> {
    if !ssl.enabled {
        return Ok(None);
    }

    let missing = |what: &str| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("TLS is enabled but no {what} is configured"),
        )
    };
    let cert_path = ssl.cert_path.as_deref().ok_or_else(|| missing("certificate"))?;
    let key_path = ssl.key_path.as_deref().ok_or_else(|| missing("private key"))?;

    tracing::info!(cert = %cert_path.display(), "Enabling TLS for the web frontend");
    load_tls_config(cert_path, key_path).await.map(Some)
}
