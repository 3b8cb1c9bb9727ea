use std::fmt;

/// A domain name represented as a sequence of labels, where each label
/// consists of a length octet followed by that number of octets. The
/// name terminates with the zero length octet for the null label of
/// the root. Comparisons and hashing are case-insensitive, as DNS
/// names are.
///
/// Labels must be 63 octets or less; a full name must be 255 octets
/// or less on the wire. Those bounds are enforced on decode.
#[derive(Debug, Clone, Default)]
pub struct Name(Vec<String>);

#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("truncated name at offset {0}")]
    Truncated(usize),
    #[error("label length {0} exceeds 63 octets")]
    LabelTooLong(usize),
    #[error("compression pointer loop or forward reference at offset {0}")]
    BadPointer(usize),
    #[error("name exceeds 255 octets on the wire")]
    TooLong,
}

impl Name {
    pub fn root() -> Self {
        Name(vec![])
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Name(labels)
    }

    /// Parses a `google.com` style dotted string. The empty string and
    /// `"."` both parse to the root name.
    pub fn from_dotted(s: &str) -> Self {
        let s = s.trim_end_matches('.');
        if s.is_empty() {
            return Name::root();
        }
        Name(s.split('.').map(|l| l.to_string()).collect())
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a name starting at `offset` in `raw`, following
    /// compression pointers (RFC 1035 §4.1.4). `offset` is advanced
    /// past the name as it appears at the call site — i.e. past the
    /// first pointer if one was followed, not past the pointed-to
    /// data.
    pub fn decode(raw: &[u8], offset: &mut usize) -> Result<Self, NameError> {
        let mut labels = Vec::new();
        let mut cursor = *offset;
        let mut jumped = false;
        let mut end_of_name = *offset;
        let mut total_len = 0usize;
        // Bound the number of pointer hops to defend against loops.
        let mut hops = 0;

        loop {
            let len_byte = *raw.get(cursor).ok_or(NameError::Truncated(cursor))?;

            if len_byte == 0 {
                if !jumped {
                    end_of_name = cursor + 1;
                }
                break;
            }

            if len_byte & 0b1100_0000 == 0b1100_0000 {
                let hi = (len_byte & 0b0011_1111) as usize;
                let lo = *raw.get(cursor + 1).ok_or(NameError::Truncated(cursor))? as usize;
                let target = (hi << 8) | lo;
                if target >= cursor {
                    return Err(NameError::BadPointer(cursor));
                }
                if !jumped {
                    end_of_name = cursor + 2;
                    jumped = true;
                }
                cursor = target;
                hops += 1;
                if hops > 128 {
                    return Err(NameError::BadPointer(cursor));
                }
                continue;
            }

            let len = len_byte as usize;
            if len > 63 {
                return Err(NameError::LabelTooLong(len));
            }
            let start = cursor + 1;
            let end = start + len;
            let label = raw
                .get(start..end)
                .ok_or(NameError::Truncated(cursor))?;
            labels.push(String::from_utf8_lossy(label).into_owned());
            total_len += len + 1;
            if total_len > 255 {
                return Err(NameError::TooLong);
            }
            cursor = end;
        }

        *offset = end_of_name;
        Ok(Name(labels))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for label in &self.0 {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    /// Produces the reverse-lookup name for a PTR question:
    /// `<reversed-octets>.in-addr.arpa` for IPv4, `<reversed-nibbles>.ip6.arpa`
    /// for IPv6.
    pub fn from_ip(ip: std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(v4) => {
                let mut labels: Vec<String> =
                    v4.octets().iter().rev().map(|o| o.to_string()).collect();
                labels.push("in-addr".to_string());
                labels.push("arpa".to_string());
                Name(labels)
            }
            std::net::IpAddr::V6(v6) => {
                let mut labels = Vec::with_capacity(34);
                for byte in v6.octets().iter().rev() {
                    labels.push(format!("{:x}", byte & 0xF));
                    labels.push(format!("{:x}", byte >> 4));
                }
                labels.push("ip6".to_string());
                labels.push("arpa".to_string());
                Name(labels)
            }
        }
    }

    pub fn to_dotted(&self) -> String {
        if self.0.is_empty() {
            ".".to_string()
        } else {
            self.0.join(".")
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dotted())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}
impl Eq for Name {}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for label in &self.0 {
            for b in label.bytes() {
                b.to_ascii_lowercase().hash(state);
            }
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::from_dotted(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_roundtrip() {
        let name = Name::from_dotted("example.com");
        assert_eq!(vec!["example", "com"], name.labels());
        assert_eq!("example.com", name.to_dotted());
    }

    #[test]
    fn root_is_empty() {
        assert!(Name::from_dotted("").is_root());
        assert!(Name::from_dotted(".").is_root());
        assert_eq!(".", Name::root().to_dotted());
    }

    #[test]
    fn case_insensitive_equality() {
        assert_eq!(Name::from_dotted("Example.COM"), Name::from_dotted("example.com"));
    }

    #[test]
    fn decode_plain_labels() {
        let raw = [6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0];
        let mut offset = 0;
        let name = Name::decode(&raw, &mut offset).unwrap();
        assert_eq!(Name::from_dotted("google.com"), name);
        assert_eq!(12, offset);
    }

    #[test]
    fn decode_follows_compression_pointer() {
        // "com" at offset 0, "google" + pointer-to-0 at offset 4.
        let mut raw = vec![3, b'c', b'o', b'm', 0];
        let base = raw.len();
        raw.extend_from_slice(&[6, b'g', b'o', b'o', b'g', b'l', b'e']);
        raw.push(0xC0);
        raw.push(0x00);
        let mut offset = base;
        let name = Name::decode(&raw, &mut offset).unwrap();
        assert_eq!(Name::from_dotted("google.com"), name);
        assert_eq!(base + 9, offset);
    }

    #[test]
    fn decode_rejects_forward_pointer() {
        let raw = [0xC0, 0x05, 0, 0, 0, 0];
        let mut offset = 0;
        assert!(Name::decode(&raw, &mut offset).is_err());
    }

    #[test]
    fn reverse_ipv4_for_ptr() {
        let ip: std::net::IpAddr = "192.0.2.1".parse().unwrap();
        assert_eq!("1.2.0.192.in-addr.arpa", Name::from_ip(ip).to_dotted());
    }

    #[test]
    fn reverse_ipv6_for_ptr() {
        let ip: std::net::IpAddr = "2001:db8::1".parse().unwrap();
        let reversed = Name::from_ip(ip).to_dotted();
        assert!(reversed.ends_with("ip6.arpa"));
        assert!(reversed.starts_with("1.0.0.0"));
    }
}
