use super::name::{Name, NameError};
use super::rdata::RData;
use super::types::{Class, Type};

/// The answer, authority, and additional sections all share this
/// format: a variable number of resource records, where the number of
/// records is given by the corresponding count field in the header.
/// # Examples:
/// ```shell
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                      NAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub class: Class,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub fn new(name: Name, class: Class, ttl: u32, rdata: RData) -> Self {
        Self { name, class, ttl, rdata }
    }

    pub fn rtype(&self) -> Type {
        self.rdata.rtype()
    }

    pub fn decode(raw: &[u8], offset: &mut usize) -> Result<Self, NameError> {
        let name = Name::decode(raw, offset)?;

        let typ = u16::from_be_bytes(
            raw.get(*offset..*offset + 2).ok_or(NameError::Truncated(*offset))?.try_into().unwrap(),
        );
        *offset += 2;
        let class = u16::from_be_bytes(
            raw.get(*offset..*offset + 2).ok_or(NameError::Truncated(*offset))?.try_into().unwrap(),
        );
        *offset += 2;
        let ttl = u32::from_be_bytes(
            raw.get(*offset..*offset + 4).ok_or(NameError::Truncated(*offset))?.try_into().unwrap(),
        );
        *offset += 4;
        let rdlength = u16::from_be_bytes(
            raw.get(*offset..*offset + 2).ok_or(NameError::Truncated(*offset))?.try_into().unwrap(),
        ) as usize;
        *offset += 2;

        let rdata = RData::decode(typ, raw, *offset, rdlength)?;
        *offset += rdlength;

        Ok(Self { name, class, ttl, rdata })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.name.encode();
        out.extend_from_slice(&self.rtype().to_be_bytes());
        out.extend_from_slice(&self.class.to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        let rdata = self.rdata.encode();
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&rdata);
        out
    }
}
