use std::net::IpAddr;
use std::sync::Arc;

use crate::cache::{Cache, NullCache};
use crate::client::ClientResolver;
use crate::config::{Protocol, ResolverConfig};
use crate::dns::{DnsDatagram, DnsQuestion, Name, RData, CLASS_IN, TYPE_AAAA};
use crate::error::ResolveError;
use crate::nameserver::{self, NameServer};
use crate::proxy::{DirectDispatcher, ProxyDispatcher};
use crate::transport::{LiveTransport, Transport};

/// A suspended parent resolution, pushed when the resolver needs the
/// address of a name server it doesn't have yet.
#[derive(Debug, Clone)]
struct ResolverFrame {
    question: DnsQuestion,
    servers: Vec<NameServer>,
    ns_index: usize,
    protocol: Protocol,
}

/// The core recursive/iterative state machine. Holds only
/// immutable configuration — `Arc`-cheap to clone, safe to share
/// across concurrent `resolve()` calls, each of which keeps its own
/// stack and working state on its local async-fn frame.
#[derive(Clone)]
pub struct IterativeResolver {
    config: Arc<ResolverConfig>,
}

impl IterativeResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub async fn resolve(
        &self,
        question: DnsQuestion,
        servers: Option<Vec<NameServer>>,
        cache: Option<&dyn Cache>,
        proxy: Option<&dyn ProxyDispatcher>,
    ) -> Result<DnsDatagram, ResolveError> {
        self.resolve_with_transport(question, servers, cache, proxy, None).await
    }

    /// Like [`IterativeResolver::resolve`], but lets a caller substitute
    /// a non-network [`Transport`] — the seam tests use to script
    /// responses instead of hitting real name servers.
    pub async fn resolve_with_transport(
        &self,
        question: DnsQuestion,
        servers: Option<Vec<NameServer>>,
        cache: Option<&dyn Cache>,
        proxy: Option<&dyn ProxyDispatcher>,
        transport: Option<&dyn Transport>,
    ) -> Result<DnsDatagram, ResolveError> {
        let null_cache = NullCache;
        let cache = cache.unwrap_or(&null_cache);
        let direct = DirectDispatcher;
        let has_proxy = proxy.is_some();
        let proxy = proxy.unwrap_or(&direct);
        let live = LiveTransport;
        let transport = transport.unwrap_or(&live);

        let mut q = question;
        let mut n: Vec<NameServer> = servers.unwrap_or_default();
        let mut pr = self.config.protocol;
        let mut stack: Vec<ResolverFrame> = Vec::new();
        let mut stack_ns_index: usize = 0;
        let mut last_error: Option<anyhow::Error> = None;

        'stack_loop: loop {
            // 1. Cache check.
            let cache_request = DnsDatagram::new_query(q.clone());
            let cache_response = cache.query(&cache_request).await;

            if cache_response.is_no_error() && !cache_response.answer.is_empty() {
                if stack.is_empty() {
                    log::trace!("cache hit for {}", q.name);
                    return Ok(cache_response);
                }
                let resolved = first_address(&cache_response);
                let mut frame = stack.pop().expect("stack non-empty");
                // The resolved address lands on frame.ns_index itself, so
                // resumption re-queries that NS rather than skipping it.
                stack_ns_index = frame.ns_index;
                if let Some(ip) = resolved {
                    install_address(&mut frame.servers[frame.ns_index], ip, pr);
                }
                q = frame.question;
                n = frame.servers;
                pr = frame.protocol;
                continue 'stack_loop;
            }

            if cache_response.is_no_error() && cache_response.first_soa_in_authority().is_some() {
                if stack.is_empty() {
                    return Ok(cache_response);
                }
                if q.qtype == TYPE_AAAA {
                    q = DnsQuestion::new(q.name.clone(), crate::dns::TYPE_A, q.qclass);
                    continue 'stack_loop;
                }
                let frame = stack.pop().expect("stack non-empty");
                stack_ns_index = frame.ns_index + 1;
                q = frame.question;
                n = frame.servers;
                pr = frame.protocol;
                continue 'stack_loop;
            }

            if cache_response.is_name_error() {
                if stack.is_empty() {
                    return Err(ResolveError::name_error(cache_response));
                }
                let frame = stack.pop().expect("stack non-empty");
                stack_ns_index = frame.ns_index + 1;
                q = frame.question;
                n = frame.servers;
                pr = frame.protocol;
                continue 'stack_loop;
            }

            if cache_response.is_no_error()
                && cache_response.answer.is_empty()
                && !cache_response.authority.is_empty()
                && n.is_empty()
            {
                let delegation = nameserver::extract_from_response(&cache_response, self.config.prefer_ipv6, true);
                if !delegation.is_empty() {
                    log::trace!("cache knows a delegation for {}", q.name);
                    n = delegation;
                }
            }

            // 2. Roots default.
            if n.is_empty() {
                n = nameserver::roots(self.config.prefer_ipv6);
                nameserver::shuffle(&mut n);
            }

            // 3. Resolver loop.
            let mut hop = 1;
            'resolver_loop: loop {
                let original_len = n.len();
                let start = stack_ns_index;
                stack_ns_index = 0;
                let mut suspended = false;

                for i in start..original_len {
                    let ns = &n[i];
                    if ns.endpoint.is_none() && ns.https_url.is_none() && !has_proxy {
                        if stack.len() >= self.config.stack_max {
                            log::debug!("suspended-frame stack at its bound, skipping unresolved {}", ns.host);
                            last_error = Some(anyhow::anyhow!("suspended-frame stack depth exceeded"));
                            continue;
                        }
                        log::debug!("suspending to resolve address of {}", ns.host);
                        stack.push(ResolverFrame {
                            question: q.clone(),
                            servers: n.clone(),
                            ns_index: i,
                            protocol: pr,
                        });
                        let qtype = if self.config.prefer_ipv6 { TYPE_AAAA } else { crate::dns::TYPE_A };
                        q = DnsQuestion::new(Name::from_dotted(&ns.host), qtype, CLASS_IN);
                        n = Vec::new();
                        pr = self.config.recursive_protocol;
                        suspended = true;
                        break;
                    }

                    let single = [n[i].clone()];
                    let client = ClientResolver::with_transport(
                        &single,
                        pr,
                        self.config.retries,
                        self.config.timeout,
                        Some(proxy),
                        Some(transport),
                    );
                    let response = match client.resolve(DnsDatagram::new_query(q.clone())).await {
                        Ok(response) => response,
                        Err(e) => {
                            last_error = Some(e.into());
                            continue;
                        }
                    };

                    cache.cache_response(&response).await;

                    if response.header.tc() {
                        log::debug!("terminal truncated response from {}", n[i].host);
                        if stack.is_empty() {
                            return Ok(response);
                        }
                        let frame = stack.pop().expect("stack non-empty");
                        stack_ns_index = frame.ns_index + 1;
                        q = frame.question;
                        n = frame.servers;
                        pr = frame.protocol;
                        continue 'stack_loop;
                    }

                    if response.is_no_error() && !response.answer.is_empty() {
                        if !response.answer[0].name.eq(&q.name) {
                            log::debug!("misconfigured server {} answered for the wrong name", n[i].host);
                            continue;
                        }
                        if stack.is_empty() {
                            return Ok(response);
                        }
                        let resolved = first_address(&response);
                        let mut frame = stack.pop().expect("stack non-empty");
                        // The resolved address lands on frame.ns_index itself, so
                        // resumption re-queries that NS rather than skipping it.
                        stack_ns_index = frame.ns_index;
                        if let Some(ip) = resolved {
                            install_address(&mut frame.servers[frame.ns_index], ip, pr);
                        }
                        q = frame.question;
                        n = frame.servers;
                        pr = frame.protocol;
                        continue 'stack_loop;
                    }

                    if response.is_no_error() && response.first_soa_in_authority().is_some() {
                        if stack.is_empty() {
                            return Ok(response);
                        }
                        if q.qtype == TYPE_AAAA {
                            q = DnsQuestion::new(q.name.clone(), crate::dns::TYPE_A, q.qclass);
                            continue 'resolver_loop;
                        }
                        let frame = stack.pop().expect("stack non-empty");
                        stack_ns_index = frame.ns_index + 1;
                        q = frame.question;
                        n = frame.servers;
                        pr = frame.protocol;
                        continue 'stack_loop;
                    }

                    if response.is_name_error() {
                        if stack.is_empty() {
                            return Err(ResolveError::name_error(response));
                        }
                        let frame = stack.pop().expect("stack non-empty");
                        stack_ns_index = frame.ns_index + 1;
                        q = frame.question;
                        n = frame.servers;
                        pr = frame.protocol;
                        continue 'stack_loop;
                    }

                    if response.is_no_error() && !response.authority.is_empty() {
                        if empty_response_from_authoritative(&response, &n[i]) {
                            if stack.is_empty() {
                                return Ok(response);
                            }
                            let frame = stack.pop().expect("stack non-empty");
                            stack_ns_index = frame.ns_index + 1;
                            q = frame.question;
                            n = frame.servers;
                            pr = frame.protocol;
                            continue 'stack_loop;
                        }

                        if hop == self.config.hop_max {
                            if stack.is_empty() {
                                return Ok(response);
                            }
                            let frame = stack.pop().expect("stack non-empty");
                            stack_ns_index = frame.ns_index + 1;
                            q = frame.question;
                            n = frame.servers;
                            pr = frame.protocol;
                            continue 'stack_loop;
                        }

                        let referral = nameserver::extract_from_response(&response, self.config.prefer_ipv6, false);
                        if referral.is_empty() {
                            if i + 1 == original_len {
                                if stack.is_empty() {
                                    return Ok(response);
                                }
                                let frame = stack.pop().expect("stack non-empty");
                                stack_ns_index = frame.ns_index + 1;
                                q = frame.question;
                                n = frame.servers;
                                pr = frame.protocol;
                                continue 'stack_loop;
                            }
                            continue;
                        }

                        if pr.is_forwarder_only() {
                            if stack.is_empty() {
                                return Ok(response);
                            }
                            let frame = stack.pop().expect("stack non-empty");
                            stack_ns_index = frame.ns_index + 1;
                            q = frame.question;
                            n = frame.servers;
                            pr = frame.protocol;
                            continue 'stack_loop;
                        }

                        let mut referral = referral;
                        nameserver::shuffle(&mut referral);
                        n = referral;
                        hop += 1;
                        continue 'resolver_loop;
                    }

                    // NoError, no answers, no authority.
                    if i + 1 == original_len {
                        if stack.is_empty() {
                            return Ok(response);
                        }
                        let frame = stack.pop().expect("stack non-empty");
                        stack_ns_index = frame.ns_index + 1;
                        q = frame.question;
                        n = frame.servers;
                        pr = frame.protocol;
                        continue 'stack_loop;
                    }
                }

                if suspended {
                    continue 'stack_loop;
                }

                // Every server in this hop's pass failed.
                if stack.is_empty() {
                    return Err(ResolveError::NoResponse { cause: last_error });
                }
                let frame = stack.pop().expect("stack non-empty");
                stack_ns_index = frame.ns_index + 1;
                q = frame.question;
                n = frame.servers;
                pr = frame.protocol;
                continue 'stack_loop;
            }
        }
    }
}

fn first_address(response: &DnsDatagram) -> Option<IpAddr> {
    response.answer.iter().find_map(|rr| match &rr.rdata {
        RData::A(v4) => Some(IpAddr::V4(*v4)),
        RData::Aaaa(v6) => Some(IpAddr::V6(*v6)),
        _ => None,
    })
}

fn install_address(ns: &mut NameServer, ip: IpAddr, pr: Protocol) {
    ns.endpoint = Some(std::net::SocketAddr::new(ip, pr.default_port()));
}

/// RFC 1035-observed quirk: some authoritative servers answer an empty
/// NOERROR with an NS record in authority pointing right back at
/// themselves rather than a SOA, for a name they do in fact serve.
/// Detected as a dead end rather than a referral.
fn empty_response_from_authoritative(response: &DnsDatagram, responding: &NameServer) -> bool {
    response.authority.iter().any(|rr| {
        if !rr.name.eq(&response.question.name) {
            return false;
        }
        matches!(&rr.rdata, RData::Ns(target) if target.to_dotted().eq_ignore_ascii_case(&responding.host))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{header::rcode, ResourceRecord, TYPE_A};
    use std::net::{Ipv4Addr, SocketAddr};

    fn ns(host: &str, ip: Ipv4Addr) -> NameServer {
        NameServer::from_endpoint(host, SocketAddr::new(IpAddr::V4(ip), 53))
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_without_network() {
        struct AlwaysHits;
        #[async_trait::async_trait]
        impl Cache for AlwaysHits {
            async fn query(&self, request: &DnsDatagram) -> DnsDatagram {
                let mut response = DnsDatagram::new_query(request.question.clone());
                response.header.with_qr(true).with_rcode(rcode::NO_ERROR);
                response.answer.push(ResourceRecord::new(
                    request.question.name.clone(),
                    CLASS_IN,
                    300,
                    RData::A(Ipv4Addr::new(93, 184, 216, 34)),
                ));
                response
            }
            async fn cache_response(&self, _response: &DnsDatagram) {}
        }

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let question = DnsQuestion::new(Name::from_dotted("example.com"), TYPE_A, CLASS_IN);
        let cache = AlwaysHits;
        let result = resolver.resolve(question, Some(vec![ns("ns1", Ipv4Addr::new(1, 1, 1, 1))]), Some(&cache), None).await;
        assert!(result.unwrap().is_no_error());
    }

    #[tokio::test]
    async fn name_error_at_root_with_no_servers_fails() {
        let resolver = IterativeResolver::new(ResolverConfig { timeout: std::time::Duration::from_millis(20), ..Default::default() });
        let question = DnsQuestion::new(Name::from_dotted("example.invalid"), TYPE_A, CLASS_IN);
        // No reachable servers and no cache: every attempt fails with a
        // transport error, exhausting the budget.
        let result = resolver.resolve(question, Some(vec![ns("dead", Ipv4Addr::new(192, 0, 2, 1))]), None, None).await;
        assert!(result.is_err());
    }

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::error::TransportError;
    use crate::transport::Transport;

    /// An in-memory scripted responder: each name server host has its own
    /// FIFO queue of replies, served in order regardless of protocol.
    /// Used in place of the real network transports to test the state
    /// machine deterministically.
    struct ScriptedTransport {
        by_host: Mutex<HashMap<String, VecDeque<DnsDatagram>>>,
        calls: Mutex<Vec<(String, Protocol)>>,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self { by_host: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
        }

        fn push(&self, host: &str, response: DnsDatagram) {
            self.by_host.lock().unwrap().entry(host.to_string()).or_default().push_back(response);
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            protocol: Protocol,
            ns: &NameServer,
            _request: &DnsDatagram,
            _timeout: Duration,
            _proxy: &dyn ProxyDispatcher,
        ) -> Result<DnsDatagram, TransportError> {
            self.calls.lock().unwrap().push((ns.host.clone(), protocol));
            self.by_host.lock().unwrap().get_mut(&ns.host).and_then(|q| q.pop_front()).ok_or_else(|| {
                TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("no scripted response queued for {}", ns.host),
                ))
            })
        }
    }

    fn no_error(question: &DnsQuestion) -> DnsDatagram {
        let mut d = DnsDatagram::new_query(question.clone());
        d.header.with_qr(true).with_rcode(rcode::NO_ERROR);
        d
    }

    fn nxdomain(question: &DnsQuestion) -> DnsDatagram {
        let mut d = DnsDatagram::new_query(question.clone());
        d.header.with_qr(true).with_rcode(rcode::NAME_ERROR);
        d
    }

    #[tokio::test]
    async fn resolve_ip_follows_a_two_hop_referral_and_populates_glue() {
        let transport = ScriptedTransport::new();
        let question = DnsQuestion::new(Name::from_dotted("example.com"), TYPE_A, CLASS_IN);

        let mut root_reply = no_error(&question);
        root_reply.authority.push(ResourceRecord::new(
            Name::from_dotted("com"),
            CLASS_IN,
            3600,
            RData::Ns(Name::from_dotted("a.gtld-servers.net")),
        ));
        root_reply.additional.push(ResourceRecord::new(
            Name::from_dotted("a.gtld-servers.net"),
            CLASS_IN,
            3600,
            RData::A(Ipv4Addr::new(192, 5, 6, 30)),
        ));
        transport.push("root1", root_reply);

        let mut tld_reply = no_error(&question);
        tld_reply.authority.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            3600,
            RData::Ns(Name::from_dotted("ns1.example.com")),
        ));
        tld_reply.additional.push(ResourceRecord::new(
            Name::from_dotted("ns1.example.com"),
            CLASS_IN,
            3600,
            RData::A(Ipv4Addr::new(199, 43, 135, 53)),
        ));
        transport.push("a.gtld-servers.net", tld_reply);

        let mut answer = no_error(&question);
        answer.answer.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        ));
        transport.push("ns1.example.com", answer);

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let result = resolver
            .resolve_with_transport(
                question,
                Some(vec![ns("root1", Ipv4Addr::new(198, 41, 0, 4))]),
                None,
                None,
                Some(&transport),
            )
            .await
            .unwrap();

        assert!(result.is_no_error());
        assert_eq!(1, result.answer.len());
        assert_eq!(RData::A(Ipv4Addr::new(93, 184, 216, 34)), result.answer[0].rdata);

        let calls = transport.calls.lock().unwrap();
        assert_eq!(
            vec![
                ("root1".to_string(), Protocol::Udp),
                ("a.gtld-servers.net".to_string(), Protocol::Udp),
                ("ns1.example.com".to_string(), Protocol::Udp),
            ],
            *calls
        );
    }

    #[tokio::test]
    async fn nxdomain_from_authority_surfaces_as_name_error() {
        let transport = ScriptedTransport::new();
        let question = DnsQuestion::new(Name::from_dotted("does-not-exist.test"), TYPE_A, CLASS_IN);

        let mut reply = nxdomain(&question);
        reply.authority.push(ResourceRecord::new(
            Name::from_dotted("test"),
            CLASS_IN,
            3600,
            RData::Soa(crate::dns::Soa {
                mname: Name::from_dotted("ns.test"),
                rname: Name::from_dotted("hostmaster.test"),
                serial: 1,
                refresh: 3600,
                retry: 600,
                expire: 86400,
                minimum: 300,
            }),
        ));
        transport.push("auth1", reply);

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let result = resolver
            .resolve_with_transport(
                question,
                Some(vec![ns("auth1", Ipv4Addr::new(203, 0, 113, 1))]),
                None,
                None,
                Some(&transport),
            )
            .await;

        match result {
            Err(ResolveError::NameError { response }) => {
                assert!(response.is_name_error());
                assert!(!response.authority.is_empty());
            }
            other => panic!("expected NameError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_udp_reply_retries_exactly_once_over_tcp() {
        let transport = ScriptedTransport::new();
        let question = DnsQuestion::new(Name::from_dotted("large.test"), TYPE_A, CLASS_IN);

        let mut truncated = no_error(&question);
        truncated.header.with_tc(true);
        transport.push("big1", truncated);

        let mut answer = no_error(&question);
        answer.answer.push(ResourceRecord::new(
            Name::from_dotted("large.test"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(10, 0, 0, 9)),
        ));
        transport.push("big1", answer);

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let result = resolver
            .resolve_with_transport(
                question,
                Some(vec![ns("big1", Ipv4Addr::new(203, 0, 113, 9))]),
                None,
                None,
                Some(&transport),
            )
            .await
            .unwrap();

        assert!(!result.header.tc());
        assert_eq!(1, result.answer.len());
        assert_eq!(
            vec![("big1".to_string(), Protocol::Udp), ("big1".to_string(), Protocol::Tcp)],
            *transport.calls.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn suspends_to_resolve_missing_glue_then_resumes() {
        let transport = ScriptedTransport::new();
        let question = DnsQuestion::new(Name::from_dotted("example.com"), TYPE_A, CLASS_IN);

        let mut referral = no_error(&question);
        referral.authority.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            3600,
            RData::Ns(Name::from_dotted("ns2.example.com")),
        ));
        // No glue in additional: the resolver must suspend to resolve
        // ns2.example.com's own address before it can be queried.
        transport.push("root1", referral);

        // Resolving the suspended NS's address falls back to the
        // configured root set (the suspended question carries no server
        // list of its own); every root gets the same reply so the test
        // doesn't depend on shuffle order.
        let mut ns_address = no_error(&DnsQuestion::new(Name::from_dotted("ns2.example.com"), TYPE_A, CLASS_IN));
        ns_address.answer.push(ResourceRecord::new(
            Name::from_dotted("ns2.example.com"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(198, 51, 100, 7)),
        ));
        for root in nameserver::roots(false) {
            transport.push(&root.host, ns_address.clone());
        }

        let mut answer = no_error(&question);
        answer.answer.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        ));
        transport.push("ns2.example.com", answer);

        let resolver = IterativeResolver::new(ResolverConfig::default());
        let result = resolver
            .resolve_with_transport(
                question,
                Some(vec![ns("root1", Ipv4Addr::new(198, 41, 0, 4))]),
                None,
                None,
                Some(&transport),
            )
            .await
            .unwrap();

        assert!(result.is_no_error());
        assert_eq!(1, result.answer.len());
        assert_eq!(RData::A(Ipv4Addr::new(93, 184, 216, 34)), result.answer[0].rdata);
    }
}
