//! Per-protocol DNS transports. Each variant implements a
//! single operation: given a request datagram, return the response
//! datagram or fail with a [`TransportError`]. Socket acquisition goes
//! through the proxy when one is present.

mod https_json;
mod https_wire;
mod tcp;
mod tls;
mod udp;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Protocol;
use crate::dns::DnsDatagram;
use crate::error::TransportError;
use crate::nameserver::NameServer;
use crate::proxy::ProxyDispatcher;

/// Carries one request/response exchange to a name server. The real
/// network transports below implement this; tests substitute an
/// in-memory scripted responder instead of opening sockets.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        protocol: Protocol,
        ns: &NameServer,
        request: &DnsDatagram,
        timeout: Duration,
        proxy: &dyn ProxyDispatcher,
    ) -> Result<DnsDatagram, TransportError>;
}

/// Dispatches to the five real network transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveTransport;

#[async_trait]
impl Transport for LiveTransport {
    async fn send(
        &self,
        protocol: Protocol,
        ns: &NameServer,
        request: &DnsDatagram,
        timeout: Duration,
        proxy: &dyn ProxyDispatcher,
    ) -> Result<DnsDatagram, TransportError> {
        match protocol {
            Protocol::Udp => udp::send(ns, request, timeout, proxy).await,
            Protocol::Tcp => tcp::send(ns, request, timeout, proxy).await,
            Protocol::Tls => tls::send(ns, request, timeout, proxy).await,
            Protocol::HttpsWire => https_wire::send(ns, request, timeout).await,
            Protocol::HttpsJson => https_json::send(ns, request, timeout).await,
        }
    }
}

fn endpoint(ns: &NameServer) -> Result<std::net::SocketAddr, TransportError> {
    ns.endpoint.ok_or(TransportError::NoEndpoint)
}
