use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

use crate::cache::{Cache, NullCache};
use crate::config::{Protocol, ResolverConfig};
use crate::dns::{DnsDatagram, Name, RData, ResourceRecord, TYPE_A, TYPE_AAAA};
use crate::error::ResolveError;
use crate::proxy::ProxyDispatcher;

/// A name server the resolver can talk to: a host label (or an IP
/// address written as text), an optional already-resolved endpoint,
/// and an optional DNS-over-HTTPS URL. At most one of {endpoint, DoH
/// URL} is needed for direct use; if neither is set, `host` must still
/// be resolved via [`NameServer::resolve_endpoint`] before the server
/// can be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameServer {
    pub host: String,
    pub endpoint: Option<SocketAddr>,
    pub https_url: Option<String>,
    /// Port parsed from a bare `host:port` form before `host` itself
    /// has been resolved to an address. Not part of the public data
    /// model; it's consumed by `resolve_endpoint`.
    pending_port: Option<u16>,
}

impl NameServer {
    pub fn from_endpoint(host: impl Into<String>, endpoint: SocketAddr) -> Self {
        Self { host: host.into(), endpoint: Some(endpoint), https_url: None, pending_port: None }
    }

    pub fn from_https_url(host: impl Into<String>, url: impl Into<String>) -> Self {
        Self { host: host.into(), endpoint: None, https_url: Some(url.into()), pending_port: None }
    }

    pub fn from_host(host: impl Into<String>) -> Self {
        Self { host: host.into(), endpoint: None, https_url: None, pending_port: None }
    }

    /// Parses the textual forms: `host`, `host:port`, `ip`,
    /// `ip:port`, `[ipv6]:port`, `https://.../dns-query`.
    pub fn parse(text: &str, protocol: Protocol) -> anyhow::Result<Self> {
        if let Some(rest) = text.strip_prefix("https://") {
            let host = rest.split('/').next().unwrap_or(rest).split(':').next().unwrap_or(rest);
            return Ok(Self::from_https_url(host, text));
        }

        if let Some(inner) = text.strip_prefix('[') {
            // [ipv6]:port
            let (addr_part, port_part) = inner
                .split_once(']')
                .ok_or_else(|| anyhow::anyhow!("missing closing ']' in {text}"))?;
            let ip: Ipv6Addr = addr_part.parse()?;
            let port = port_part
                .strip_prefix(':')
                .map(|p| p.parse::<u16>())
                .transpose()?
                .unwrap_or(protocol.default_port());
            return Ok(Self::from_endpoint(
                ip.to_string(),
                SocketAddr::new(IpAddr::V6(ip), port),
            ));
        }

        if let Ok(ip) = text.parse::<IpAddr>() {
            return Ok(Self::from_endpoint(text, SocketAddr::new(ip, protocol.default_port())));
        }

        if let Some((host_or_ip, port)) = text.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                if let Ok(ip) = host_or_ip.parse::<IpAddr>() {
                    return Ok(Self::from_endpoint(host_or_ip, SocketAddr::new(ip, port)));
                }
                // host:port with a non-IP host: endpoint is still
                // unresolved, but we now know which port to use once
                // it is.
                let mut ns = Self::from_host(host_or_ip);
                ns.pending_port = Some(port);
                return Ok(ns);
            }
        }

        Ok(Self::from_host(text))
    }

    pub fn needs_resolution(&self) -> bool {
        self.endpoint.is_none() && self.https_url.is_none()
    }

    /// Populates `endpoint` if absent, by recursively resolving `host`
    /// (A, or AAAA falling back to A if empty) starting from the root
    /// servers.
    pub async fn resolve_endpoint(
        &mut self,
        cache: Option<&dyn Cache>,
        proxy: Option<&dyn ProxyDispatcher>,
        prefer_ipv6: bool,
        protocol: Protocol,
        retries: u32,
    ) -> Result<(), ResolveError> {
        if !self.needs_resolution() {
            return Ok(());
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            self.endpoint = Some(SocketAddr::new(ip, self.pending_port.unwrap_or(protocol.default_port())));
            return Ok(());
        }

        let resolver = crate::iterative::IterativeResolver::new(ResolverConfig {
            retries,
            protocol,
            recursive_protocol: protocol,
            prefer_ipv6,
            ..ResolverConfig::default()
        });

        let null = NullCache;
        let cache = cache.unwrap_or(&null);

        let mut qtype = if prefer_ipv6 { TYPE_AAAA } else { TYPE_A };
        let name = Name::from_dotted(&self.host);
        let mut response = resolver
            .resolve(crate::dns::DnsQuestion::new(name.clone(), qtype, crate::dns::CLASS_IN), None, Some(cache), proxy)
            .await?;

        if qtype == TYPE_AAAA && response.answer.is_empty() {
            qtype = TYPE_A;
            response = resolver
                .resolve(crate::dns::DnsQuestion::new(name, qtype, crate::dns::CLASS_IN), None, Some(cache), proxy)
                .await?;
        }

        let ip = first_address(&response).ok_or_else(ResolveError::no_response_without_cause)?;
        self.endpoint = Some(SocketAddr::new(ip, self.pending_port.unwrap_or(protocol.default_port())));
        Ok(())
    }
}

fn first_address(response: &DnsDatagram) -> Option<IpAddr> {
    response.answer.iter().find_map(|rr| match &rr.rdata {
        RData::A(v4) => Some(IpAddr::V4(*v4)),
        RData::Aaaa(v6) => Some(IpAddr::V6(*v6)),
        _ => None,
    })
}

/// Permutes `servers` using the process CSPRNG, distributing load and
/// avoiding sticky server selection. Never mutates the caller's own
/// list — callers pass a `Vec` they already own a copy of.
pub fn shuffle(servers: &mut [NameServer]) {
    servers.shuffle(&mut rand::thread_rng());
}

/// Walks the authority section for NS records and pairs each with any
/// glue (A/AAAA) in additional matching the NS target by name.
/// Preserves DNS referral order; the caller is expected to
/// shuffle the result before use. If `allow_only_resolved`, NS records
/// without glue are dropped instead of being returned unresolved.
pub fn extract_from_response(
    response: &DnsDatagram,
    prefer_ipv6: bool,
    allow_only_resolved: bool,
) -> Vec<NameServer> {
    let mut out = Vec::new();
    for authority_rr in &response.authority {
        let RData::Ns(target) = &authority_rr.rdata else { continue };

        let glue = response.additional.iter().find_map(|rr| {
            if rr.name != *target {
                return None;
            }
            match (&rr.rdata, prefer_ipv6) {
                (RData::Aaaa(v6), true) => Some(IpAddr::V6(*v6)),
                (RData::A(v4), false) => Some(IpAddr::V4(*v4)),
                _ => None,
            }
        }).or_else(|| {
            response.additional.iter().find_map(|rr| {
                if rr.name != *target {
                    return None;
                }
                match &rr.rdata {
                    RData::A(v4) => Some(IpAddr::V4(*v4)),
                    RData::Aaaa(v6) => Some(IpAddr::V6(*v6)),
                    _ => None,
                }
            })
        });

        match glue {
            Some(ip) => out.push(NameServer::from_endpoint(
                target.to_dotted(),
                SocketAddr::new(ip, Protocol::Udp.default_port()),
            )),
            None if !allow_only_resolved => out.push(NameServer::from_host(target.to_dotted())),
            None => {}
        }
    }
    out
}

/// The thirteen IPv4 root servers, `a.root-servers.net` … `m.root-servers.net`.
pub static ROOTS_V4: Lazy<Vec<NameServer>> = Lazy::new(|| {
    const ROOTS: [(&str, Ipv4Addr); 13] = [
        ("a.root-servers.net", Ipv4Addr::new(198, 41, 0, 4)),
        ("b.root-servers.net", Ipv4Addr::new(170, 247, 170, 2)),
        ("c.root-servers.net", Ipv4Addr::new(192, 33, 4, 12)),
        ("d.root-servers.net", Ipv4Addr::new(199, 7, 91, 13)),
        ("e.root-servers.net", Ipv4Addr::new(192, 203, 230, 10)),
        ("f.root-servers.net", Ipv4Addr::new(192, 5, 5, 241)),
        ("g.root-servers.net", Ipv4Addr::new(192, 112, 36, 4)),
        ("h.root-servers.net", Ipv4Addr::new(198, 97, 190, 53)),
        ("i.root-servers.net", Ipv4Addr::new(192, 36, 148, 17)),
        ("j.root-servers.net", Ipv4Addr::new(192, 58, 128, 30)),
        ("k.root-servers.net", Ipv4Addr::new(193, 0, 14, 129)),
        ("l.root-servers.net", Ipv4Addr::new(199, 7, 83, 42)),
        ("m.root-servers.net", Ipv4Addr::new(202, 12, 27, 33)),
    ];
    ROOTS
        .iter()
        .map(|(host, ip)| NameServer::from_endpoint(*host, SocketAddr::new(IpAddr::V4(*ip), 53)))
        .collect()
});

/// The thirteen IPv6 root servers, same ordering as [`ROOTS_V4`].
pub static ROOTS_V6: Lazy<Vec<NameServer>> = Lazy::new(|| {
    const ROOTS: [(&str, &str); 13] = [
        ("a.root-servers.net", "2001:503:ba3e::2:30"),
        ("b.root-servers.net", "2801:1b8:10::b"),
        ("c.root-servers.net", "2001:500:2::c"),
        ("d.root-servers.net", "2001:500:2d::d"),
        ("e.root-servers.net", "2001:500:a8::e"),
        ("f.root-servers.net", "2001:500:2f::f"),
        ("g.root-servers.net", "2001:500:12::d0d"),
        ("h.root-servers.net", "2001:500:1::53"),
        ("i.root-servers.net", "2001:7fe::53"),
        ("j.root-servers.net", "2001:503:c27::2:30"),
        ("k.root-servers.net", "2001:7fd::1"),
        ("l.root-servers.net", "2001:500:9f::42"),
        ("m.root-servers.net", "2001:dc3::35"),
    ];
    ROOTS
        .iter()
        .map(|(host, ip)| {
            let ip: Ipv6Addr = ip.parse().expect("hardcoded root address");
            NameServer::from_endpoint(*host, SocketAddr::new(IpAddr::V6(ip), 53))
        })
        .collect()
});

/// Returns a fresh caller-owned copy of the configured root set.
pub fn roots(prefer_ipv6: bool) -> Vec<NameServer> {
    if prefer_ipv6 { ROOTS_V6.clone() } else { ROOTS_V4.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_only() {
        let ns = NameServer::parse("ns1.example.com", Protocol::Udp).unwrap();
        assert_eq!("ns1.example.com", ns.host);
        assert!(ns.needs_resolution());
    }

    #[test]
    fn parse_ip_without_port_uses_protocol_default() {
        let ns = NameServer::parse("8.8.8.8", Protocol::Tls).unwrap();
        assert_eq!(Some("8.8.8.8:853".parse().unwrap()), ns.endpoint);
    }

    #[test]
    fn parse_ip_with_port() {
        let ns = NameServer::parse("8.8.8.8:53", Protocol::Udp).unwrap();
        assert_eq!(Some("8.8.8.8:53".parse().unwrap()), ns.endpoint);
    }

    #[test]
    fn parse_bracketed_ipv6_with_port() {
        let ns = NameServer::parse("[2001:4860:4860::8888]:853", Protocol::Udp).unwrap();
        assert_eq!(Some("[2001:4860:4860::8888]:853".parse().unwrap()), ns.endpoint);
    }

    #[test]
    fn parse_https_url() {
        let ns = NameServer::parse("https://dns.example/dns-query", Protocol::HttpsWire).unwrap();
        assert_eq!(Some("https://dns.example/dns-query".to_string()), ns.https_url);
        assert!(ns.endpoint.is_none());
    }

    #[test]
    fn shuffle_never_mutates_original_vec_identity() {
        let original = roots(false);
        let mut working = original.clone();
        shuffle(&mut working);
        // Same multiset, `original` untouched (we only ever shuffled the copy).
        assert_eq!(original.len(), working.len());
        for ns in &original {
            assert!(working.contains(ns));
        }
    }

    #[test]
    fn extract_pairs_ns_with_matching_glue() {
        use crate::dns::{CLASS_IN, DnsQuestion};
        let mut response = DnsDatagram::new_query(DnsQuestion::new(
            Name::from_dotted("example.com"),
            TYPE_A,
            CLASS_IN,
        ));
        response.authority.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            3600,
            RData::Ns(Name::from_dotted("ns1.example.com")),
        ));
        response.additional.push(ResourceRecord::new(
            Name::from_dotted("ns1.example.com"),
            CLASS_IN,
            3600,
            RData::A(Ipv4Addr::new(10, 0, 0, 1)),
        ));
        let extracted = extract_from_response(&response, false, false);
        assert_eq!(1, extracted.len());
        assert_eq!(Some("10.0.0.1:53".parse().unwrap()), extracted[0].endpoint);
    }

    #[test]
    fn extract_drops_unresolved_when_only_resolved_allowed() {
        use crate::dns::{CLASS_IN, DnsQuestion};
        let mut response = DnsDatagram::new_query(DnsQuestion::new(
            Name::from_dotted("example.com"),
            TYPE_A,
            CLASS_IN,
        ));
        response.authority.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            3600,
            RData::Ns(Name::from_dotted("ns1.example.com")),
        ));
        assert!(extract_from_response(&response, false, true).is_empty());
        assert_eq!(1, extract_from_response(&response, false, false).len());
    }
}
