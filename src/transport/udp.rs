use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout as with_timeout;

use crate::dns::DnsDatagram;
use crate::error::TransportError;
use crate::nameserver::NameServer;
use crate::proxy::ProxyDispatcher;

/// The proxy contract only hands back TCP byte streams, so a
/// proxy never actually carries a UDP datagram — its only say over UDP
/// is the `udp_available()` upgrade decision the `ClientResolver`
/// consults before choosing this transport at all.
pub async fn send(
    ns: &NameServer,
    request: &DnsDatagram,
    timeout: Duration,
    _proxy: &dyn ProxyDispatcher,
) -> Result<DnsDatagram, TransportError> {
    let remote = super::endpoint(ns)?;
    with_timeout(timeout, exchange(remote, request))
        .await
        .map_err(|_| TransportError::Timeout)?
}

async fn exchange(
    remote: std::net::SocketAddr,
    request: &DnsDatagram,
) -> Result<DnsDatagram, TransportError> {
    let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(remote).await?;
    socket.send(&request.encode()).await?;

    let mut buf = [0u8; 4096];
    let n = socket.recv(&mut buf).await?;
    Ok(DnsDatagram::decode(&buf[..n])?.with_server(remote))
}
