use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::dns::{header::rcode, DnsDatagram, DnsQuestion};

/// The resolver's only channel to a cache: response RCODE and section
/// layout communicate everything. Empty NoError is a miss;
/// NoError + SOA in authority is a negative hit; NoError + answers is
/// a positive hit; NoError with only NS/glue in authority/additional
/// is "I know a delegation"; NameError is cached NXDOMAIN.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn query(&self, request: &DnsDatagram) -> DnsDatagram;

    /// Idempotent, best-effort; failures are not surfaced to callers.
    async fn cache_response(&self, response: &DnsDatagram);
}

/// A cache that never has anything and stores nothing. Used as the
/// scratch cache `ClientResolver` step 2 creates per name-server-address
/// resolution, and as the default when a caller supplies none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn query(&self, request: &DnsDatagram) -> DnsDatagram {
        miss(request)
    }

    async fn cache_response(&self, _response: &DnsDatagram) {}
}

fn miss(request: &DnsDatagram) -> DnsDatagram {
    let mut miss = DnsDatagram::new_query(request.question.clone());
    miss.header.with_qr(true).with_rcode(rcode::NO_ERROR);
    miss
}

#[derive(Clone)]
struct Entry {
    response: DnsDatagram,
    expires_at: Instant,
}

/// A minimal TTL-aware cache, keyed by (name, type, class). Answers
/// are cached for the minimum TTL across the answer RRs; negative
/// (SOA) and delegation (NS) responses are cached for the SOA
/// minimum / NS TTL respectively. Good enough for tests and for small
/// embedded uses; production deployments would want an eviction
/// policy this doesn't attempt.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<(String, u16, u16), Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn key(question: &DnsQuestion) -> (String, u16, u16) {
        (question.name.to_dotted().to_ascii_lowercase(), question.qtype, question.qclass)
    }

    fn ttl_for(response: &DnsDatagram) -> Option<Duration> {
        let ttl = if !response.answer.is_empty() {
            response.answer.iter().map(|rr| rr.ttl).min()
        } else if !response.authority.is_empty() {
            response.authority.iter().map(|rr| rr.ttl).min()
        } else {
            None
        }?;
        Some(Duration::from_secs(ttl as u64))
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn query(&self, request: &DnsDatagram) -> DnsDatagram {
        let key = Self::key(&request.question);
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.response.clone(),
            Some(_) => {
                entries.remove(&key);
                miss(request)
            }
            None => miss(request),
        }
    }

    async fn cache_response(&self, response: &DnsDatagram) {
        let Some(ttl) = Self::ttl_for(response) else { return };
        let key = Self::key(&response.question);
        self.entries.lock().unwrap().insert(
            key,
            Entry { response: response.clone(), expires_at: Instant::now() + ttl },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{types::{CLASS_IN, TYPE_A}, Name, RData, ResourceRecord};
    use std::net::Ipv4Addr;

    fn question() -> DnsQuestion {
        DnsQuestion::new(Name::from_dotted("example.com"), TYPE_A, CLASS_IN)
    }

    #[tokio::test]
    async fn miss_is_noerror_with_no_sections() {
        let cache = InMemoryCache::new();
        let request = DnsDatagram::new_query(question());
        let response = cache.query(&request).await;
        assert!(response.is_no_error());
        assert!(response.answer.is_empty());
        assert!(response.authority.is_empty());
    }

    #[tokio::test]
    async fn cached_answer_is_a_hit_until_ttl_expires() {
        let cache = InMemoryCache::new();
        let mut response = DnsDatagram::new_query(question());
        response.header.with_qr(true);
        response.answer.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        ));
        cache.cache_response(&response).await;

        let request = DnsDatagram::new_query(question());
        let hit = cache.query(&request).await;
        assert_eq!(1, hit.answer.len());
    }

    #[tokio::test]
    async fn idempotent_cache_response() {
        let cache = InMemoryCache::new();
        let mut response = DnsDatagram::new_query(question());
        response.header.with_qr(true);
        response.answer.push(ResourceRecord::new(
            Name::from_dotted("example.com"),
            CLASS_IN,
            300,
            RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        ));
        cache.cache_response(&response).await;
        cache.cache_response(&response).await;
        let hit = cache.query(&DnsDatagram::new_query(question())).await;
        assert_eq!(1, hit.answer.len());
    }
}
