//! An iterative/recursive DNS client resolver: given a question, chase
//! referrals and CNAME chains from root or caller-supplied name
//! servers down to an authoritative answer, across five transport
//! protocols, with optional caching and proxy dispatch.

pub mod cache;
pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod helpers;
pub mod iterative;
pub mod nameserver;
pub mod proxy;
pub mod transport;

pub use cache::{Cache, InMemoryCache, NullCache};
pub use client::ClientResolver;
pub use config::{Protocol, ResolverConfig};
pub use dns::{DnsDatagram, DnsQuestion, Name, ResourceRecord};
pub use error::{ResolveError, TransportError};
pub use iterative::IterativeResolver;
pub use nameserver::NameServer;
pub use proxy::{DirectDispatcher, ProxyDispatcher};
