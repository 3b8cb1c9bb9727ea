use std::time::Duration;

use rand::Rng;

use crate::cache::InMemoryCache;
use crate::config::Protocol;
use crate::dns::DnsDatagram;
use crate::error::ResolveError;
use crate::nameserver::NameServer;
use crate::proxy::{DirectDispatcher, ProxyDispatcher};
use crate::transport::{LiveTransport, Transport};

/// Resolves one question against a small, fixed set of name servers:
/// random start, round-robin, UDP→TCP truncation retry, retry across
/// servers on transport failure.
pub struct ClientResolver<'a> {
    servers: &'a [NameServer],
    protocol: Protocol,
    retries: u32,
    timeout: Duration,
    proxy: &'a dyn ProxyDispatcher,
    transport: &'a dyn Transport,
}

static DIRECT: DirectDispatcher = DirectDispatcher;
static LIVE: LiveTransport = LiveTransport;

impl<'a> ClientResolver<'a> {
    pub fn new(
        servers: &'a [NameServer],
        protocol: Protocol,
        retries: u32,
        timeout: Duration,
        proxy: Option<&'a dyn ProxyDispatcher>,
    ) -> Self {
        Self::with_transport(servers, protocol, retries, timeout, proxy, None)
    }

    /// Like [`ClientResolver::new`], but lets a caller (namely
    /// `IterativeResolver` and tests) substitute a non-network
    /// [`Transport`].
    pub fn with_transport(
        servers: &'a [NameServer],
        protocol: Protocol,
        retries: u32,
        timeout: Duration,
        proxy: Option<&'a dyn ProxyDispatcher>,
        transport: Option<&'a dyn Transport>,
    ) -> Self {
        Self {
            servers,
            protocol,
            retries,
            timeout,
            proxy: proxy.unwrap_or(&DIRECT),
            transport: transport.unwrap_or(&LIVE),
        }
    }

    pub async fn resolve(&self, mut request: DnsDatagram) -> Result<DnsDatagram, ResolveError> {
        if self.servers.is_empty() {
            return Err(ResolveError::no_response_without_cause());
        }

        let mut protocol = self.protocol;
        if protocol == Protocol::Udp && !self.proxy.udp_available() {
            log::debug!("proxy reports no UDP support, upgrading to TCP for this call");
            protocol = Protocol::Tcp;
        }

        let mut index = rand::thread_rng().gen_range(0..self.servers.len());
        let budget = self.retries as usize * self.servers.len();
        let mut last_error: Option<anyhow::Error> = None;

        for _ in 0..budget {
            let mut server = self.servers[index].clone();
            index = (index + 1) % self.servers.len();

            if server.endpoint.is_none() && server.https_url.is_none() {
                let scratch = InMemoryCache::new();
                if let Err(e) = server
                    .resolve_endpoint(Some(&scratch), Some(self.proxy), false, protocol, self.retries)
                    .await
                {
                    log::debug!("could not resolve address of name server {}: {e}", server.host);
                    last_error = Some(e.into());
                    continue;
                }
            }

            request.header.with_id(rand::thread_rng().gen());

            log::trace!("querying {} over {:?}", server.host, protocol);
            match self.transport.send(protocol, &server, &request, self.timeout, self.proxy).await {
                Ok(response) if protocol == Protocol::Udp && response.header.tc() => {
                    log::debug!("truncated UDP reply from {}, retrying over TCP", server.host);
                    request.header.with_id(rand::thread_rng().gen());
                    match self.transport.send(Protocol::Tcp, &server, &request, self.timeout, self.proxy).await {
                        Ok(tcp_response) => return Ok(tcp_response),
                        Err(e) => {
                            last_error = Some(e.into());
                            continue;
                        }
                    }
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            }
        }

        Err(ResolveError::NoResponse { cause: last_error })
    }
}
