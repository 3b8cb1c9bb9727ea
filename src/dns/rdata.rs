use std::net::{Ipv4Addr, Ipv6Addr};

use super::name::{Name, NameError};
use super::types::{self, Type};

/// The RDATA variants this crate actually needs to interpret. Every
/// other on-the-wire type (DNSSEC RRs, HINFO, the MB/MD/MF/MG/MINFO
/// experimental mailbox types, WKS, NULL, ...) round-trips as
/// [`RData::Opaque`] — the resolver never needs to look inside them,
/// it only forwards them.
///
/// ref: https://www.rfc-editor.org/rfc/rfc1035#section-3.3
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(Name),
    Cname(Name),
    Soa(Soa),
    Ptr(Name),
    Mx { preference: u16, exchange: Name },
    Txt(Vec<Vec<u8>>),
    Srv { priority: u16, weight: u16, port: u16, target: Name },
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl RData {
    /// Decodes RDATA of the given `rtype`, given the whole message
    /// (for following compression pointers into names inside RDATA)
    /// and the byte range the RDLENGTH field delimited.
    pub fn decode(rtype: Type, raw: &[u8], rdata_start: usize, rdata_len: usize) -> Result<Self, NameError> {
        let rdata = raw
            .get(rdata_start..rdata_start + rdata_len)
            .ok_or(NameError::Truncated(rdata_start))?;

        Ok(match rtype {
            types::TYPE_A => {
                let b: [u8; 4] = rdata.try_into().map_err(|_| NameError::Truncated(rdata_start))?;
                RData::A(Ipv4Addr::from(b))
            }
            types::TYPE_AAAA => {
                let b: [u8; 16] = rdata.try_into().map_err(|_| NameError::Truncated(rdata_start))?;
                RData::Aaaa(Ipv6Addr::from(b))
            }
            types::TYPE_NS => {
                let mut off = rdata_start;
                RData::Ns(Name::decode(raw, &mut off)?)
            }
            types::TYPE_CNAME => {
                let mut off = rdata_start;
                RData::Cname(Name::decode(raw, &mut off)?)
            }
            types::TYPE_PTR => {
                let mut off = rdata_start;
                RData::Ptr(Name::decode(raw, &mut off)?)
            }
            types::TYPE_SOA => {
                let mut off = rdata_start;
                let mname = Name::decode(raw, &mut off)?;
                let rname = Name::decode(raw, &mut off)?;
                let take_u32 = |raw: &[u8], off: &mut usize| -> Result<u32, NameError> {
                    let v = u32::from_be_bytes(
                        raw.get(*off..*off + 4)
                            .ok_or(NameError::Truncated(*off))?
                            .try_into()
                            .unwrap(),
                    );
                    *off += 4;
                    Ok(v)
                };
                RData::Soa(Soa {
                    mname,
                    rname,
                    serial: take_u32(raw, &mut off)?,
                    refresh: take_u32(raw, &mut off)?,
                    retry: take_u32(raw, &mut off)?,
                    expire: take_u32(raw, &mut off)?,
                    minimum: take_u32(raw, &mut off)?,
                })
            }
            types::TYPE_MX => {
                let preference = u16::from_be_bytes(
                    rdata.get(0..2).ok_or(NameError::Truncated(rdata_start))?.try_into().unwrap(),
                );
                let mut off = rdata_start + 2;
                let exchange = Name::decode(raw, &mut off)?;
                RData::Mx { preference, exchange }
            }
            types::TYPE_TXT => {
                let mut strings = Vec::new();
                let mut i = 0;
                while i < rdata.len() {
                    let len = rdata[i] as usize;
                    i += 1;
                    let end = i + len;
                    strings.push(rdata.get(i..end).ok_or(NameError::Truncated(rdata_start))?.to_vec());
                    i = end;
                }
                RData::Txt(strings)
            }
            types::TYPE_SRV => {
                let priority = u16::from_be_bytes(rdata.get(0..2).ok_or(NameError::Truncated(rdata_start))?.try_into().unwrap());
                let weight = u16::from_be_bytes(rdata.get(2..4).ok_or(NameError::Truncated(rdata_start))?.try_into().unwrap());
                let port = u16::from_be_bytes(rdata.get(4..6).ok_or(NameError::Truncated(rdata_start))?.try_into().unwrap());
                let mut off = rdata_start + 6;
                let target = Name::decode(raw, &mut off)?;
                RData::Srv { priority, weight, port, target }
            }
            _ => RData::Opaque(rdata.to_vec()),
        })
    }

    /// Encodes RDATA without name compression (acceptable: outgoing
    /// messages from this resolver are queries and cache writebacks,
    /// never large zone transfers where compression would matter).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RData::A(v4) => v4.octets().to_vec(),
            RData::Aaaa(v6) => v6.octets().to_vec(),
            RData::Ns(n) => n.encode(),
            RData::Cname(n) => n.encode(),
            RData::Ptr(n) => n.encode(),
            RData::Soa(soa) => {
                let mut out = soa.mname.encode();
                out.extend(soa.rname.encode());
                out.extend(soa.serial.to_be_bytes());
                out.extend(soa.refresh.to_be_bytes());
                out.extend(soa.retry.to_be_bytes());
                out.extend(soa.expire.to_be_bytes());
                out.extend(soa.minimum.to_be_bytes());
                out
            }
            RData::Mx { preference, exchange } => {
                let mut out = preference.to_be_bytes().to_vec();
                out.extend(exchange.encode());
                out
            }
            RData::Txt(strings) => {
                let mut out = Vec::new();
                for s in strings {
                    out.push(s.len() as u8);
                    out.extend_from_slice(s);
                }
                out
            }
            RData::Srv { priority, weight, port, target } => {
                let mut out = priority.to_be_bytes().to_vec();
                out.extend(weight.to_be_bytes());
                out.extend(port.to_be_bytes());
                out.extend(target.encode());
                out
            }
            RData::Opaque(bytes) => bytes.clone(),
        }
    }

    pub fn rtype(&self) -> Type {
        match self {
            RData::A(_) => types::TYPE_A,
            RData::Aaaa(_) => types::TYPE_AAAA,
            RData::Ns(_) => types::TYPE_NS,
            RData::Cname(_) => types::TYPE_CNAME,
            RData::Ptr(_) => types::TYPE_PTR,
            RData::Soa(_) => types::TYPE_SOA,
            RData::Mx { .. } => types::TYPE_MX,
            RData::Txt(_) => types::TYPE_TXT,
            RData::Srv { .. } => types::TYPE_SRV,
            RData::Opaque(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_roundtrips() {
        let rdata = RData::A(Ipv4Addr::new(93, 184, 216, 34));
        let bytes = rdata.encode();
        let decoded = RData::decode(types::TYPE_A, &bytes, 0, bytes.len()).unwrap();
        assert_eq!(rdata, decoded);
    }

    #[test]
    fn mx_decode_reads_preference_and_exchange() {
        let mut raw = vec![0, 10];
        raw.extend(Name::from_dotted("mail.example.com").encode());
        let decoded = RData::decode(types::TYPE_MX, &raw, 0, raw.len()).unwrap();
        match decoded {
            RData::Mx { preference, exchange } => {
                assert_eq!(10, preference);
                assert_eq!(Name::from_dotted("mail.example.com"), exchange);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ns_name_follows_compression_pointer_into_message() {
        // Message: [root-zero][NS rdata pointing back to offset 0]
        let mut raw = vec![0u8]; // name at offset 0 is root
        let ns_start = raw.len();
        raw.push(0xC0);
        raw.push(0x00);
        let decoded = RData::decode(types::TYPE_NS, &raw, ns_start, 2).unwrap();
        assert_eq!(RData::Ns(Name::root()), decoded);
    }

    #[test]
    fn unknown_type_is_opaque() {
        let raw = vec![1, 2, 3, 4];
        let decoded = RData::decode(999, &raw, 0, raw.len()).unwrap();
        assert_eq!(RData::Opaque(raw), decoded);
    }
}
