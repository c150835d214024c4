//! TLS material loading for the proxy and management listeners.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::error::ServeError;

/// Read a PEM certificate/key pair and assemble the rustls config.
///
/// Each file is read separately so a failure names the offending input
/// instead of a single opaque io error for the pair.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, ServeError> {
    let cert = read_pem(cert_path, "certificate").await?;
    let key = read_pem(key_path, "private key").await?;
    RustlsConfig::from_pem(cert, key)
        .await
        .map_err(|source| ServeError::Tls {
            file: "pem material",
            path: cert_path.display().to_string(),
            source,
        })
}

async fn read_pem(path: &Path, file: &'static str) -> Result<Vec<u8>, ServeError> {
    tokio::fs::read(path).await.map_err(|source| ServeError::Tls {
        file,
        path: path.display().to_string(),
        source,
    })
}
