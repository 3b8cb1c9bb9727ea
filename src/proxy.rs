use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::TransportError;

/// A tunneling proxy the resolver can dispatch transport connections
/// through, e.g. for a caller running inside a SOCKS/SSH tunnel.
/// TLS/cert handling below the byte-stream is
/// the caller's concern; this trait only hands back a connected
/// stream.
#[async_trait]
pub trait ProxyDispatcher: Send + Sync {
    /// Connects to `remote` through the proxy and returns a byte
    /// stream the caller frames itself (TCP length-prefixing, TLS
    /// handshake, etc. happen above this layer).
    async fn connect(&self, remote: SocketAddr) -> Result<TcpStream, TransportError>;

    /// Whether this proxy can carry UDP datagrams. If not, the
    /// `ClientResolver` upgrades a UDP request to TCP for the whole
    /// call.
    fn udp_available(&self) -> bool;

    /// Opens a tunnel for SMTP-style callers that need one end-to-end
    /// byte stream rather than a single request/response exchange.
    /// Out of scope for the resolver itself but part of the contract
    /// other collaborators rely on.
    async fn create_tunnel(
        &self,
        remote: SocketAddr,
        tls_wrap: bool,
        ignore_cert: bool,
    ) -> Result<TcpStream, TransportError>;
}

/// The default dispatcher used when the caller supplies no proxy:
/// connects directly, reports full UDP availability.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDispatcher;

#[async_trait]
impl ProxyDispatcher for DirectDispatcher {
    async fn connect(&self, remote: SocketAddr) -> Result<TcpStream, TransportError> {
        TcpStream::connect(remote).await.map_err(TransportError::Io)
    }

    fn udp_available(&self) -> bool {
        true
    }

    async fn create_tunnel(
        &self,
        remote: SocketAddr,
        _tls_wrap: bool,
        _ignore_cert: bool,
    ) -> Result<TcpStream, TransportError> {
        self.connect(remote).await
    }
}
