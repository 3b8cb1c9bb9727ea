use std::time::Duration;

/// The wire carrier for a DNS exchange. TLS and the two HTTPS variants
/// are "forwarder-only" transports: they never drive
/// iterative referral chasing themselves, they're meant to talk to a
/// single upstream forwarder/resolver that does its own recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
    Tls,
    HttpsWire,
    HttpsJson,
}

impl Protocol {
    pub fn is_forwarder_only(self) -> bool {
        matches!(self, Protocol::Tls | Protocol::HttpsWire | Protocol::HttpsJson)
    }

    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Udp | Protocol::Tcp => 53,
            Protocol::Tls => 853,
            Protocol::HttpsWire | Protocol::HttpsJson => 443,
        }
    }
}

/// Tunables for one `resolve()` call. Cheap to clone; an `Arc<ResolverConfig>`
/// is what a resolver instance actually holds, so concurrent calls never
/// contend over it: resolver instances hold only immutable
/// configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Retry budget multiplier: total attempts = retries * server_count.
    pub retries: u32,
    pub timeout: Duration,
    /// Hop bound per stack frame.
    pub hop_max: u32,
    /// Suspended-frame stack depth bound.
    pub stack_max: usize,
    pub prefer_ipv6: bool,
    /// The protocol used for the caller's own question.
    pub protocol: Protocol,
    /// The protocol used while resolving a name server's own address
    /// during a suspend.
    pub recursive_protocol: Protocol,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            timeout: Duration::from_secs(5),
            hop_max: 16,
            stack_max: 10,
            prefer_ipv6: false,
            protocol: Protocol::Udp,
            recursive_protocol: Protocol::Udp,
        }
    }
}
