// tests/integration/tls_test.rs

//! End-to-end tests for the TLS ingestion port.

use super::test_helpers::{call, read_reply, sample_metrics, spawn_tls_listener, transfer_service};
use fluxgate::config::{Config, RpcTlsConfig};
use fluxgate::server;
use rcgen::CertifiedKey;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// A self-signed certificate written to disk the way an operator would
/// provision one.
struct TestCert {
    _dir: tempfile::TempDir,
    crt_path: PathBuf,
    key_path: PathBuf,
    cert_der: CertificateDer<'static>,
}

fn generate_cert() -> TestCert {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("certificate generation should succeed");

    let dir = tempfile::tempdir().unwrap();
    let crt_path = dir.path().join("server.crt");
    let key_path = dir.path().join("server.key");
    std::fs::write(&crt_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCert {
        cert_der: cert.der().clone(),
        _dir: dir,
        crt_path,
        key_path,
    }
}

/// A connector that trusts exactly the given certificate.
fn trusting_connector(cert_der: CertificateDer<'static>) -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.add(cert_der).unwrap();
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// A connector with an empty trust store; every server certificate is
/// rejected during its handshake.
fn untrusting_connector() -> TlsConnector {
    let config = ClientConfig::builder()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[tokio::test]
async fn test_tls_roundtrip_after_handshake() {
    let cert = generate_cert();
    let (sink, service) = transfer_service();
    let (addr, _shutdown) = spawn_tls_listener(service, &cert.crt_path, &cert.key_path).await;

    let connector = trusting_connector(cert.cert_der.clone());
    let tcp = TcpStream::connect(addr).await.unwrap();
    let mut tls = connector
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .expect("handshake against a trusted certificate should succeed");

    let reply = call(&mut tls, "Transfer.Ping", json!([]), 1).await;
    assert_eq!(reply["id"], json!(1));
    assert_eq!(reply["result"]["code"], json!(0));

    let reply = call(&mut tls, "Transfer.Update", sample_metrics(), 2).await;
    assert_eq!(reply["result"]["total"], json!(1));
    assert_eq!(sink.batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_untrusting_client_fails_handshake_listener_survives() {
    let cert = generate_cert();
    let (_, service) = transfer_service();
    let (addr, _shutdown) = spawn_tls_listener(service, &cert.crt_path, &cert.key_path).await;

    // A client that rejects the server certificate fails its own handshake.
    let tcp = TcpStream::connect(addr).await.unwrap();
    let result = untrusting_connector()
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await;
    assert!(result.is_err());

    // The listener keeps serving clients that do trust the certificate.
    let tcp = TcpStream::connect(addr).await.unwrap();
    let mut tls = trusting_connector(cert.cert_der.clone())
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .unwrap();
    let reply = call(&mut tls, "Transfer.Ping", json!([]), 3).await;
    assert_eq!(reply["result"]["code"], json!(0));
}

#[tokio::test]
async fn test_plaintext_client_on_tls_port_is_rejected() {
    let cert = generate_cert();
    let (_, service) = transfer_service();
    let (addr, _shutdown) = spawn_tls_listener(service, &cert.crt_path, &cert.key_path).await;

    // Raw JSON on the TLS port never completes a handshake; the server
    // drops the connection without serving a frame.
    let mut plain = TcpStream::connect(addr).await.unwrap();
    let _ = plain
        .write_all(b"{\"method\":\"Transfer.Ping\",\"id\":1}\n")
        .await;
    assert!(read_reply(&mut plain).await.is_none());

    // And a proper TLS client still gets through afterwards.
    let tcp = TcpStream::connect(addr).await.unwrap();
    let mut tls = trusting_connector(cert.cert_der.clone())
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .unwrap();
    let reply = call(&mut tls, "Transfer.Ping", json!([]), 4).await;
    assert_eq!(reply["result"]["code"], json!(0));
}

#[tokio::test]
async fn test_missing_certificate_is_fatal_before_bind() {
    let (_, service) = transfer_service();
    let (shutdown_tx, _) = broadcast::channel(1);

    let config = Config {
        rpc_with_tls: Some(RpcTlsConfig {
            enabled: true,
            listen: "127.0.0.1:0".to_string(),
            crt_file: "/nonexistent/server.crt".to_string(),
            key_file: "/nonexistent/server.key".to_string(),
        }),
        ..Config::default()
    };

    let result = server::start_rpc_with_tls(&config, service, &shutdown_tx).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_disabled_tls_listener_binds_nothing() {
    let (_, service) = transfer_service();
    let (shutdown_tx, _) = broadcast::channel(1);

    let config = Config {
        rpc_with_tls: Some(RpcTlsConfig {
            enabled: false,
            // None of these need to exist when the port is disabled.
            listen: "127.0.0.1:0".to_string(),
            crt_file: "/nonexistent/server.crt".to_string(),
            key_file: "/nonexistent/server.key".to_string(),
        }),
        ..Config::default()
    };

    let started = server::start_rpc_with_tls(&config, service, &shutdown_tx)
        .await
        .unwrap();
    assert!(started.is_none());
}
