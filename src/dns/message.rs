use std::net::SocketAddr;

use super::header::{rcode, DnsHeader};
use super::name::{Name, NameError};
use super::question::DnsQuestion;
use super::rr::ResourceRecord;
use super::types::Type;

/// Metadata the resolver attaches to a datagram it received — never
/// part of the wire format, never encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// The name server that produced this response, when known.
    pub server: Option<SocketAddr>,
}

/// # DNS Structure:
/// ```shell
/// +---------------------+
/// |        Header       |
/// +---------------------+
/// |       Question      | the question for the name server
/// +---------------------+
/// |        Answer       | RRs answering the question
/// +---------------------+
/// |      Authority      | RRs pointing toward an authority
/// +---------------------+
/// |      Additional     | RRs holding additional information
/// +---------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsDatagram {
    pub header: DnsHeader,
    pub question: DnsQuestion,
    pub answer: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
    pub metadata: Metadata,
}

impl DnsDatagram {
    /// Builds a fresh outgoing query for `question`, with a new random
    /// id and RD set.
    pub fn new_query(question: DnsQuestion) -> Self {
        Self {
            header: DnsHeader::new_query(),
            question,
            answer: vec![],
            authority: vec![],
            additional: vec![],
            metadata: Metadata::default(),
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self, NameError> {
        if raw.len() < 12 {
            return Err(NameError::Truncated(raw.len()));
        }
        let header = DnsHeader::from_bytes(raw[..12].try_into().unwrap());
        let mut offset = 12;

        // Only single-question messages are produced or expected by
        // this resolver; additional questions (legal but unused in
        // practice) are skipped past rather than rejected.
        let question = DnsQuestion::decode(raw, &mut offset)?;
        for _ in 1..header.qdcount() {
            DnsQuestion::decode(raw, &mut offset)?;
        }

        let mut answer = Vec::with_capacity(header.ancount() as usize);
        for _ in 0..header.ancount() {
            answer.push(ResourceRecord::decode(raw, &mut offset)?);
        }
        let mut authority = Vec::with_capacity(header.nscount() as usize);
        for _ in 0..header.nscount() {
            authority.push(ResourceRecord::decode(raw, &mut offset)?);
        }
        let mut additional = Vec::with_capacity(header.arcount() as usize);
        for _ in 0..header.arcount() {
            additional.push(ResourceRecord::decode(raw, &mut offset)?);
        }

        Ok(Self {
            header,
            question,
            answer,
            authority,
            additional,
            metadata: Metadata::default(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.with_qdcount(1);
        header.with_ancount(self.answer.len() as u16);
        header.with_nscount(self.authority.len() as u16);
        header.with_arcount(self.additional.len() as u16);

        let mut out = header.to_bytes().to_vec();
        out.extend(self.question.encode());
        for rr in &self.answer {
            out.extend(rr.encode());
        }
        for rr in &self.authority {
            out.extend(rr.encode());
        }
        for rr in &self.additional {
            out.extend(rr.encode());
        }
        out
    }

    pub fn rcode(&self) -> u8 {
        self.header.rcode()
    }

    pub fn is_name_error(&self) -> bool {
        self.rcode() == rcode::NAME_ERROR
    }

    pub fn is_no_error(&self) -> bool {
        self.rcode() == rcode::NO_ERROR
    }

    /// RFC 1035 §4.1.1 defines RCODE 0 as "no error" and leaves the
    /// payload shape (answers vs. an authority-only negative/referral
    /// response) to distinguish cache and resolver outcomes; this is
    /// the sole channel cache replies use too.
    pub fn first_soa_in_authority(&self) -> Option<&ResourceRecord> {
        self.authority.first().filter(|rr| rr.rtype() == crate::dns::types::TYPE_SOA)
    }

    pub fn name(&self) -> &Name {
        &self.question.name
    }

    pub fn qtype(&self) -> Type {
        self.question.qtype
    }

    pub fn with_server(mut self, server: SocketAddr) -> Self {
        self.metadata.server = Some(server);
        self
    }
}
