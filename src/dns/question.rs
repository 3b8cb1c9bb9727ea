use super::name::{Name, NameError};
use super::types::{Class, Type};

/// The question section carries the parameters that define what is
/// being asked.
/// # Question Structure:
/// ```shell
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                     QNAME                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     QTYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     QCLASS                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: Name,
    pub qtype: Type,
    pub qclass: Class,
}

impl DnsQuestion {
    pub fn new(name: Name, qtype: Type, qclass: Class) -> Self {
        Self { name, qtype, qclass }
    }

    pub fn decode(raw: &[u8], offset: &mut usize) -> Result<Self, NameError> {
        let name = Name::decode(raw, offset)?;
        let qtype = u16::from_be_bytes(
            raw.get(*offset..*offset + 2)
                .ok_or(NameError::Truncated(*offset))?
                .try_into()
                .unwrap(),
        );
        let qclass = u16::from_be_bytes(
            raw.get(*offset + 2..*offset + 4)
                .ok_or(NameError::Truncated(*offset))?
                .try_into()
                .unwrap(),
        );
        *offset += 4;
        Ok(Self { name, qtype, qclass })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.name.encode();
        out.extend_from_slice(&self.qtype.to_be_bytes());
        out.extend_from_slice(&self.qclass.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::types::{CLASS_IN, TYPE_A};

    #[test]
    fn encode_then_decode_matches() {
        let q = DnsQuestion::new(Name::from_dotted("example.com"), TYPE_A, CLASS_IN);
        let raw = q.encode();
        let mut offset = 0;
        let decoded = DnsQuestion::decode(&raw, &mut offset).unwrap();
        assert_eq!(q, decoded);
        assert_eq!(raw.len(), offset);
    }

    #[test]
    fn decode_rejects_truncated_class() {
        let raw = [0x06, b'g', b'o', b'o', b'g', b'l', b'e', 0x00, 0x00, 0x01];
        let mut offset = 0;
        assert!(DnsQuestion::decode(&raw, &mut offset).is_err());
    }
}
