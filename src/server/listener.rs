// src/server/listener.rs

//! The accept loop shared by both ingestion ports.

use super::stream::RpcStream;
use crate::connection::ConnectionHandler;
use crate::core::handler::RpcService;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A bound ingestion port, ready to accept connections.
///
/// Both ports run this same loop; the TLS port differs only in carrying an
/// acceptor that wraps each socket in a server handshake before framing
/// begins, and in leaving TCP keep-alive to the peer.
pub struct RpcListener {
    listener: TcpListener,
    acceptor: Option<tokio_rustls::TlsAcceptor>,
    service: Arc<dyn RpcService>,
    shutdown_rx: broadcast::Receiver<()>,
    keepalive: bool,
}

impl RpcListener {
    pub fn new(
        listener: TcpListener,
        acceptor: Option<tokio_rustls::TlsAcceptor>,
        service: Arc<dyn RpcService>,
        shutdown_rx: broadcast::Receiver<()>,
        keepalive: bool,
    ) -> Self {
        Self {
            listener,
            acceptor,
            service,
            shutdown_rx,
            keepalive,
        }
    }

    /// The address the port actually bound, which differs from the
    /// configured one when an ephemeral port was requested.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until shutdown. Every connection is served by
    /// its own task, so a failure in one never reaches another; accept
    /// errors are logged and the loop keeps going.
    pub async fn run(mut self) {
        let mut connections: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("listener shutting down");
                    break;
                }

                res = self.listener.accept() => match res {
                    Ok((socket, addr)) => {
                        debug!("accepted connection from {addr}");
                        if self.keepalive
                            && let Err(e) = enable_keepalive(&socket)
                        {
                            warn!("failed to enable keep-alive for {addr}: {e}");
                        }
                        let service = self.service.clone();
                        let acceptor = self.acceptor.clone();
                        connections.spawn(serve_connection(socket, addr, acceptor, service));
                    }
                    Err(e) => {
                        error!("failed to accept connection: {e}");
                    }
                },

                Some(res) = connections.join_next() => {
                    if let Err(e) = res
                        && e.is_panic()
                    {
                        error!("connection handler panicked: {e:?}");
                    }
                }
            }
        }

        connections.shutdown().await;
    }
}

/// Serves one accepted socket: optional TLS handshake, then the framed
/// request/response loop. A failed handshake ends this connection only.
async fn serve_connection(
    socket: TcpStream,
    addr: SocketAddr,
    acceptor: Option<tokio_rustls::TlsAcceptor>,
    service: Arc<dyn RpcService>,
) {
    let stream = match acceptor {
        Some(acceptor) => match acceptor.accept(socket).await {
            Ok(tls_stream) => {
                debug!("TLS handshake successful for {addr}");
                RpcStream::Tls(Box::new(tls_stream))
            }
            Err(e) => {
                warn!("TLS handshake error for {addr}: {e}");
                return;
            }
        },
        None => RpcStream::Plain(socket),
    };

    let mut handler = ConnectionHandler::new(stream, addr, service);
    if let Err(e) = handler.run().await {
        warn!("connection from {addr} terminated unexpectedly: {e}");
    }
}

/// Turns on TCP keep-alive for an accepted agent connection.
fn enable_keepalive(socket: &TcpStream) -> io::Result<()> {
    socket2::SockRef::from(socket).set_keepalive(true)
}
