use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::ServerName;
use tokio::time::timeout as with_timeout;
use tokio_rustls::TlsConnector;

use crate::dns::DnsDatagram;
use crate::error::TransportError;
use crate::nameserver::NameServer;
use crate::proxy::ProxyDispatcher;

use super::tcp::{read_framed, write_framed};

fn connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

pub async fn send(
    ns: &NameServer,
    request: &DnsDatagram,
    timeout: Duration,
    proxy: &dyn ProxyDispatcher,
) -> Result<DnsDatagram, TransportError> {
    let remote = super::endpoint(ns)?;
    with_timeout(timeout, exchange(ns, remote, request, proxy))
        .await
        .map_err(|_| TransportError::Timeout)?
}

async fn exchange(
    ns: &NameServer,
    remote: std::net::SocketAddr,
    request: &DnsDatagram,
    proxy: &dyn ProxyDispatcher,
) -> Result<DnsDatagram, TransportError> {
    let tcp = proxy.connect(remote).await?;
    let server_name = ServerName::try_from(ns.host.clone())
        .map_err(|e| TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
    let mut tls = connector().connect(server_name, tcp).await?;

    write_framed(&mut tls, request).await?;
    let raw = read_framed(&mut tls).await?;
    Ok(DnsDatagram::decode(&raw)?.with_server(remote))
}
