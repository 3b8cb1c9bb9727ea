use crate::dns::DnsDatagram;

/// The two error kinds surfaced to callers of [`crate::iterative::IterativeResolver`]
/// and [`crate::helpers`]. Transport-level failures never reach a
/// caller directly — they accumulate as `last_error` inside [`crate::client::ClientResolver`]
/// and [`crate::iterative::IterativeResolver`] and surface wrapped in `NoResponse`
/// only once every path is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// All candidate servers were exhausted without a usable reply.
    #[error("no response from any name server")]
    NoResponse {
        #[source]
        cause: Option<anyhow::Error>,
    },

    /// An authoritative server returned NXDOMAIN for a name the caller
    /// explicitly asked about. Carries the raw response so a caller
    /// that wants the authority/SOA section can still get at it.
    #[error("name does not exist: {}", .response.name())]
    NameError { response: DnsDatagram },
}

impl ResolveError {
    pub fn no_response(cause: anyhow::Error) -> Self {
        ResolveError::NoResponse { cause: Some(cause) }
    }

    pub fn no_response_without_cause() -> Self {
        ResolveError::NoResponse { cause: None }
    }

    pub fn name_error(response: DnsDatagram) -> Self {
        ResolveError::NameError { response }
    }
}

/// Errors local to a single transport attempt. These never propagate to
/// callers directly; [`ClientResolver`](crate::client::ClientResolver) and
/// [`IterativeResolver`](crate::iterative::IterativeResolver) fold them into
/// `last_error` and keep trying other servers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error talking to name server: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Malformed(#[from] crate::dns::NameError),

    #[error("http error: {0}")]
    Http(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("name server has no usable endpoint")]
    NoEndpoint,
}
