use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout as with_timeout;

use crate::dns::DnsDatagram;
use crate::error::TransportError;
use crate::nameserver::NameServer;
use crate::proxy::ProxyDispatcher;

pub async fn send(
    ns: &NameServer,
    request: &DnsDatagram,
    timeout: Duration,
    proxy: &dyn ProxyDispatcher,
) -> Result<DnsDatagram, TransportError> {
    let remote = super::endpoint(ns)?;
    with_timeout(timeout, exchange(remote, request, proxy))
        .await
        .map_err(|_| TransportError::Timeout)?
}

async fn exchange(
    remote: std::net::SocketAddr,
    request: &DnsDatagram,
    proxy: &dyn ProxyDispatcher,
) -> Result<DnsDatagram, TransportError> {
    let mut stream = proxy.connect(remote).await?;
    write_framed(&mut stream, request).await?;
    let raw = read_framed(&mut stream).await?;
    Ok(DnsDatagram::decode(&raw)?.with_server(remote))
}

/// 2-byte big-endian length prefix, as RFC 1035 §4.2.2 requires for
/// TCP (and, by extension, TLS-wrapped TCP).
pub(super) async fn write_framed<S: AsyncWrite + Unpin>(
    stream: &mut S,
    request: &DnsDatagram,
) -> Result<(), TransportError> {
    let encoded = request.encode();
    let len = (encoded.len() as u16).to_be_bytes();
    stream.write_all(&len).await?;
    stream.write_all(&encoded).await?;
    Ok(())
}

pub(super) async fn read_framed<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut raw = vec![0u8; len];
    stream.read_exact(&mut raw).await?;
    Ok(raw)
}
