use crate::error::{Result, ServerError};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::TlsAcceptor;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";

/// Validity window of the self-signed fallback certificate.
const SELF_SIGNED_DAYS: i64 = 365;

/// Returns a server-side TLS acceptor from `cert.pem` + `key.pem` in
/// `material_dir` (the directory holding the configuration file), generating
/// a self-signed pair for `localhost` when either file is absent.
///
/// rustls negotiates TLS 1.2+ only and no client certificate is requested,
/// which is exactly the protocol contract. The acceptor wraps each accepted
/// plaintext socket before the framer sees any bytes.
pub fn load_or_generate(material_dir: &Path) -> Result<TlsAcceptor> {
    let cert_path = material_dir.join(CERT_FILE);
    let key_path = material_dir.join(KEY_FILE);

    if !cert_path.exists() || !key_path.exists() {
        tracing::info!(
            "TLS material missing in {}; generating self-signed pair",
            material_dir.display()
        );
        generate_self_signed(&cert_path, &key_path)?;
    }

    build_acceptor(&cert_path, &key_path)
}

/// Builds the acceptor from PEM files on disk.
pub fn build_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let cert_file = fs::File::open(cert_path)
        .map_err(|e| ServerError::Tls(format!("cannot open {}: {}", cert_path.display(), e)))?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| ServerError::Tls(format!("invalid certificate PEM: {}", e)))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "no certificates found in {}",
            cert_path.display()
        )));
    }

    let key_file = fs::File::open(key_path)
        .map_err(|e| ServerError::Tls(format!("cannot open {}: {}", key_path.display(), e)))?;
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| ServerError::Tls(format!("invalid key PEM: {}", e)))?
        .ok_or_else(|| ServerError::Tls(format!("no private key in {}", key_path.display())))?;

    let config = RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(format!("certificate/key rejected: {}", e)))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn generate_self_signed(cert_path: &Path, key_path: &Path) -> Result<()> {
    let key_pair = rcgen::KeyPair::generate()
        .map_err(|e| ServerError::Tls(format!("key generation failed: {}", e)))?;

    let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .map_err(|e| ServerError::Tls(format!("certificate parameters rejected: {}", e)))?;
    params.not_before = time::OffsetDateTime::now_utc();
    params.not_after = params.not_before + time::Duration::days(SELF_SIGNED_DAYS);

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| ServerError::Tls(format!("self-signing failed: {}", e)))?;

    fs::write(cert_path, cert.pem())
        .map_err(|e| ServerError::Tls(format!("writing {}: {}", cert_path.display(), e)))?;
    fs::write(key_path, key_pair.serialize_pem())
        .map_err(|e| ServerError::Tls(format!("writing {}: {}", key_path.display(), e)))?;

    tracing::info!(
        "Generated self-signed certificate {} (valid {} days)",
        cert_path.display(),
        SELF_SIGNED_DAYS
    );
    Ok(())
}
