use std::time::Duration;

use reqwest::Client;

use crate::dns::DnsDatagram;
use crate::error::TransportError;
use crate::nameserver::NameServer;

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
        .post(url)
        .header("content-type", "application/dns-message")
        .body(request.encode())
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(TransportError::Http(format!("status {}", response.status())));
    }

    let body = response.bytes().await.map_err(|e| TransportError::Http(e.to_string()))?;
    let datagram = DnsDatagram::decode(&body)?;
    Ok(match ns.endpoint {
        Some(remote) => datagram.with_server(remote),
        None => datagram,
    })
}
