pub type Type = u16;
pub type Class = u16;

/// a host address
pub const TYPE_A: Type = 1;
/// an authoritative name server
pub const TYPE_NS: Type = 2;
/// the canonical name for an alias
pub const TYPE_CNAME: Type = 5;
/// marks the start of a zone of authority
pub const TYPE_SOA: Type = 6;
/// a domain name pointer
pub const TYPE_PTR: Type = 12;
/// mail exchange
pub const TYPE_MX: Type = 15;
/// text strings
pub const TYPE_TXT: Type = 16;
/// an IPv6 host address (RFC 3596)
pub const TYPE_AAAA: Type = 28;
/// server selection (RFC 2782)
pub const TYPE_SRV: Type = 33;
/// OPT pseudo-RR (RFC 6891); carried opaquely, never interpreted.
pub const TYPE_OPT: Type = 41;
/// for QType: a request for all records
pub const TYPE_ANY: Type = 255;

/// the Internet
pub const CLASS_IN: Class = 1;
/// for QClass
pub const CLASS_ANY: Class = 255;

pub fn type_name(t: Type) -> &'static str {
    match t {
        TYPE_A => "A",
        TYPE_NS => "NS",
        TYPE_CNAME => "CNAME",
        TYPE_SOA => "SOA",
        TYPE_PTR => "PTR",
        TYPE_MX => "MX",
        TYPE_TXT => "TXT",
        TYPE_AAAA => "AAAA",
        TYPE_SRV => "SRV",
        TYPE_OPT => "OPT",
        TYPE_ANY => "ANY",
        _ => "UNKNOWN",
    }
}
