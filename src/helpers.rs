//! `ResolveIP`, `ResolveMX`, `ResolvePTR`: build a question, call the
//! iterative resolver, interpret the result, chase CNAMEs.

use std::net::IpAddr;

use crate::cache::Cache;
use crate::config::ResolverConfig;
use crate::dns::{DnsQuestion, Name, RData, CLASS_IN, TYPE_A, TYPE_AAAA, TYPE_MX, TYPE_PTR};
use crate::error::ResolveError;
use crate::iterative::IterativeResolver;
use crate::nameserver::NameServer;
use crate::proxy::ProxyDispatcher;
use crate::transport::Transport;

/// Resolves `name` to its addresses, trying AAAA first when
/// `prefer_ipv6` and downgrading to A if that comes back empty.
/// Chases CNAMEs until an address is found or `hop_max` is exhausted.
pub async fn resolve_ip(
    resolver: &IterativeResolver,
    config: &ResolverConfig,
    name: &Name,
    servers: Option<Vec<NameServer>>,
    cache: Option<&dyn Cache>,
    proxy: Option<&dyn ProxyDispatcher>,
    transport: Option<&dyn Transport>,
) -> Result<Vec<IpAddr>, ResolveError> {
    let mut qtype = if config.prefer_ipv6 { TYPE_AAAA } else { TYPE_A };
    let mut current = name.clone();

    for _ in 0..config.hop_max {
        let question = DnsQuestion::new(current.clone(), qtype, CLASS_IN);
        let response = resolver.resolve_with_transport(question, servers.clone(), cache, proxy, transport).await?;

        if response.answer.is_empty() && qtype == TYPE_AAAA {
            qtype = TYPE_A;
            continue;
        }

        let mut addresses = Vec::new();
        let mut next_cname = None;
        for rr in &response.answer {
            match &rr.rdata {
                RData::A(v4) => addresses.push(IpAddr::V4(*v4)),
                RData::Aaaa(v6) => addresses.push(IpAddr::V6(*v6)),
                RData::Cname(target) => next_cname = Some(target.clone()),
                _ => {}
            }
        }

        if !addresses.is_empty() {
            return Ok(addresses);
        }
        if let Some(target) = next_cname {
            current = target;
            continue;
        }
        return Ok(Vec::new());
    }

    Ok(Vec::new())
}

#[derive(Debug, Clone)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: Name,
    pub addresses: Vec<IpAddr>,
}

/// Resolves MX records for `name`, sorted by preference (ascending;
/// ties keep response order). When `resolve_ip` is set, fills in
/// addresses from glue when present, else calls [`resolve_ip`] per
/// exchange host — preserving the MX entry (with no addresses) on a
/// transient error, dropping it entirely on `NameError`.
pub async fn resolve_mx(
    resolver: &IterativeResolver,
    config: &ResolverConfig,
    name: &Name,
    resolve_ip_for_exchanges: bool,
    servers: Option<Vec<NameServer>>,
    cache: Option<&dyn Cache>,
    proxy: Option<&dyn ProxyDispatcher>,
    transport: Option<&dyn Transport>,
) -> Result<Vec<MxRecord>, ResolveError> {
    let question = DnsQuestion::new(name.clone(), TYPE_MX, CLASS_IN);
    let response = resolver.resolve_with_transport(question, servers.clone(), cache, proxy, transport).await?;

    let mut records: Vec<MxRecord> = response
        .answer
        .iter()
        .filter_map(|rr| match &rr.rdata {
            RData::Mx { preference, exchange } => {
                Some(MxRecord { preference: *preference, exchange: exchange.clone(), addresses: Vec::new() })
            }
            _ => None,
        })
        .collect();
    records.sort_by_key(|r| r.preference);

    if !resolve_ip_for_exchanges {
        return Ok(records);
    }

    let mut out = Vec::with_capacity(records.len());
    for mut record in records {
        let glue: Vec<IpAddr> = response
            .additional
            .iter()
            .filter(|rr| rr.name == record.exchange)
            .filter_map(|rr| match &rr.rdata {
                RData::A(v4) => Some(IpAddr::V4(*v4)),
                RData::Aaaa(v6) => Some(IpAddr::V6(*v6)),
                _ => None,
            })
            .collect();

        if !glue.is_empty() {
            record.addresses = glue;
            out.push(record);
            continue;
        }

        match resolve_ip(resolver, config, &record.exchange, servers.clone(), cache, proxy, transport).await {
            Ok(addresses) => {
                record.addresses = addresses;
                out.push(record);
            }
            Err(ResolveError::NameError { .. }) => {
                log::debug!("dropping MX {} after NXDOMAIN on its exchange host", record.exchange);
            }
            Err(_) => {
                log::debug!("keeping MX {} without an address after a transient lookup error", record.exchange);
                out.push(record);
            }
        }
    }

    Ok(out)
}

/// Resolves the PTR records for `ip`'s reverse-lookup name.
pub async fn resolve_ptr(
    resolver: &IterativeResolver,
    _config: &ResolverConfig,
    ip: IpAddr,
    servers: Option<Vec<NameServer>>,
    cache: Option<&dyn Cache>,
    proxy: Option<&dyn ProxyDispatcher>,
    transport: Option<&dyn Transport>,
) -> Result<Vec<Name>, ResolveError> {
    let question = DnsQuestion::new(Name::from_ip(ip), TYPE_PTR, CLASS_IN);
    let response = resolver.resolve_with_transport(question, servers, cache, proxy, transport).await?;
    Ok(response
        .answer
        .iter()
        .filter_map(|rr| match &rr.rdata {
            RData::Ptr(name) => Some(name.clone()),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NullCache;

    #[tokio::test]
    async fn resolve_ptr_builds_reverse_question() {
        let resolver = IterativeResolver::new(ResolverConfig { timeout: std::time::Duration::from_millis(20), ..Default::default() });
        let config = ResolverConfig::default();
        let cache = NullCache;
        let ip: IpAddr = "192.0.2.1".parse().unwrap();
        // No reachable servers configured: expect a NoResponse rather
        // than a panic building the question.
        let result = resolve_ptr(&resolver, &config, ip, Some(vec![]), Some(&cache), None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resolve_mx_uses_additional_section_glue_without_a_second_query() {
        use crate::config::Protocol;
        use crate::dns::{header::rcode, DnsDatagram, ResourceRecord};
        use crate::error::TransportError;
        use crate::nameserver::NameServer;
        use async_trait::async_trait;
        use std::net::{Ipv4Addr, SocketAddr};
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingTransport {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl Transport for CountingTransport {
            async fn send(
                &self,
                _protocol: Protocol,
                _ns: &NameServer,
                request: &DnsDatagram,
                _timeout: std::time::Duration,
                _proxy: &dyn ProxyDispatcher,
            ) -> Result<DnsDatagram, TransportError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let mut response = DnsDatagram::new_query(request.question.clone());
                response.header.with_qr(true).with_rcode(rcode::NO_ERROR);
                response.answer.push(ResourceRecord::new(
                    Name::from_dotted("mail.test"),
                    CLASS_IN,
                    300,
                    RData::Mx { preference: 10, exchange: Name::from_dotted("mx.mail.test") },
                ));
                response.additional.push(ResourceRecord::new(
                    Name::from_dotted("mx.mail.test"),
                    CLASS_IN,
                    300,
                    RData::A(Ipv4Addr::new(10, 0, 0, 1)),
                ));
                Ok(response)
            }
        }

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let config = ResolverConfig::default();
        let transport = CountingTransport { calls: AtomicUsize::new(0) };
        let servers = vec![NameServer::from_endpoint("ns1", SocketAddr::new(Ipv4Addr::new(203, 0, 113, 1).into(), 53))];

        let records = resolve_mx(
            &resolver,
            &config,
            &Name::from_dotted("mail.test"),
            true,
            Some(servers),
            None,
            None,
            Some(&transport),
        )
        .await
        .unwrap();

        assert_eq!(1, records.len());
        assert_eq!(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))], records[0].addresses);
        assert_eq!(1, transport.calls.load(Ordering::SeqCst));
    }
}
