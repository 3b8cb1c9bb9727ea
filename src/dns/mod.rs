//! A small, opaque wire-format codec for DNS messages (RFC 1035 + the
//! RFC 3596 AAAA and RFC 2782 SRV extensions). The resolver treats this
//! module as a pure, stateless collaborator: encode a [`DnsDatagram`] to
//! bytes, decode bytes to a [`DnsDatagram`]. It performs no I/O and
//! holds no resolver state.

pub mod header;
pub mod message;
pub mod name;
pub mod question;
pub mod rdata;
pub mod rr;
pub mod types;

pub use header::DnsHeader;
pub use message::{DnsDatagram, Metadata};
pub use name::{Name, NameError};
pub use question::DnsQuestion;
pub use rdata::{RData, Soa};
pub use rr::ResourceRecord;
pub use types::*;
