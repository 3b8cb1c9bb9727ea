use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::dns::{CLASS_IN, DnsDatagram, Name, RData, ResourceRecord, Soa, TYPE_AAAA, TYPE_MX,
    TYPE_NS, TYPE_SOA, TYPE_SRV, TYPE_CNAME, type_name};
use crate::error::TransportError;
use crate::nameserver::NameServer;

/// Google/Cloudflare-style DoH JSON reply. Fields the
/// resolver doesn't use (Comment, EDNS padding, etc.) are ignored by
/// `serde`'s default "unknown fields are skipped" behavior.
#[derive(Debug, Deserialize)]
struct JsonResponse {
    #[serde(rename = "Status")]
    status: u8,
    #[serde(rename = "Answer", default)]
    answer: Vec<JsonRr>,
    #[serde(rename = "Authority", default)]
    authority: Vec<JsonRr>,
    #[serde(rename = "Additional", default)]
    additional: Vec<JsonRr>,
}

#[derive(Debug, Deserialize)]
struct JsonRr {
    name: String,
    #[serde(rename = "type")]
    rtype: u16,
    #[serde(rename = "TTL")]
    ttl: u32,
    data: String,
}

pub async fn send(
    ns: &NameServer,
    request: &DnsDatagram,
    timeout: Duration,
) -> Result<DnsDatagram, TransportError> {
    let url = ns.https_url.as_ref().ok_or(TransportError::NoEndpoint)?;
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Http(e.to_string()))?;

    let response = client
        .get(url)
        .header("accept", "application/dns-json")
        .query(&[
            ("name", request.question.name.to_dotted()),
            ("type", type_name(request.question.qtype).to_string()),
        ])
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(TransportError::Http(format!("status {}", response.status())));
    }

    let parsed: JsonResponse =
        response.json().await.map_err(|e| TransportError::Http(e.to_string()))?;

    let mut datagram = DnsDatagram::new_query(request.question.clone());
    datagram.header.with_qr(true).with_rcode(parsed.status);
    datagram.answer = parsed.answer.into_iter().filter_map(to_rr).collect();
    datagram.authority = parsed.authority.into_iter().filter_map(to_rr).collect();
    datagram.additional = parsed.additional.into_iter().filter_map(to_rr).collect();
    Ok(match ns.endpoint {
        Some(remote) => datagram.with_server(remote),
        None => datagram,
    })
}

fn to_rr(rr: JsonRr) -> Option<ResourceRecord> {
    let rdata = rdata_from_json(rr.rtype, &rr.data)?;
    Some(ResourceRecord::new(Name::from_dotted(&rr.name), CLASS_IN, rr.ttl, rdata))
}

/// Parses the plaintext `data` field the JSON schema uses for each
/// record type back into structured RDATA. Types this crate doesn't
/// model are carried through as opaque bytes rather than dropped.
fn rdata_from_json(rtype: u16, data: &str) -> Option<RData> {
    use crate::dns::TYPE_A;
    match rtype {
        TYPE_A => data.parse::<Ipv4Addr>().ok().map(RData::A),
        TYPE_AAAA => data.parse::<Ipv6Addr>().ok().map(RData::Aaaa),
        TYPE_NS => Some(RData::Ns(Name::from_dotted(data))),
        TYPE_CNAME => Some(RData::Cname(Name::from_dotted(data))),
        TYPE_SOA => {
            let mut parts = data.split_whitespace();
            let mname = Name::from_dotted(parts.next()?);
            let rname = Name::from_dotted(parts.next()?);
            let serial = parts.next()?.parse().ok()?;
            let refresh = parts.next()?.parse().ok()?;
            let retry = parts.next()?.parse().ok()?;
            let expire = parts.next()?.parse().ok()?;
            let minimum = parts.next()?.parse().ok()?;
            Some(RData::Soa(Soa { mname, rname, serial, refresh, retry, expire, minimum }))
        }
        TYPE_MX => {
            let mut parts = data.split_whitespace();
            let preference = parts.next()?.parse().ok()?;
            let exchange = Name::from_dotted(parts.next()?);
            Some(RData::Mx { preference, exchange })
        }
        TYPE_SRV => {
            let mut parts = data.split_whitespace();
            let priority = parts.next()?.parse().ok()?;
            let weight = parts.next()?.parse().ok()?;
            let port = parts.next()?.parse().ok()?;
            let target = Name::from_dotted(parts.next()?);
            Some(RData::Srv { priority, weight, port, target })
        }
        crate::dns::TYPE_PTR => Some(RData::Ptr(Name::from_dotted(data))),
        crate::dns::TYPE_TXT => Some(RData::Txt(vec![data.trim_matches('"').as_bytes().to_vec()])),
        _ => Some(RData::Opaque(data.as_bytes().to_vec())),
    }
}

