use anyhow::Result;
use clap::Parser;
use rdns::config::Protocol;
use rdns::dns::{DnsQuestion, Name, CLASS_IN, TYPE_A, TYPE_AAAA};
use rdns::{IterativeResolver, NameServer, ResolverConfig};

/// Resolve a name against the public DNS hierarchy, starting from the
/// root servers unless `--server` is given.
#[derive(Parser)]
struct Args {
    /// Name to resolve, e.g. "example.com".
    name: String,

    /// Resolve AAAA instead of A.
    #[arg(long)]
    ipv6: bool,

    /// Name server to query directly instead of the root hierarchy.
    /// Accepts the forms documented for `NameServer::parse`.
    #[arg(long)]
    server: Option<String>,

    /// Transport protocol.
    #[arg(long, value_enum, default_value = "udp")]
    protocol: CliProtocol,
}

#[derive(Clone, clap::ValueEnum)]
enum CliProtocol {
    Udp,
    Tcp,
    Tls,
    HttpsWire,
    HttpsJson,
}

impl From<CliProtocol> for Protocol {
    fn from(p: CliProtocol) -> Self {
        match p {
            CliProtocol::Udp => Protocol::Udp,
            CliProtocol::Tcp => Protocol::Tcp,
            CliProtocol::Tls => Protocol::Tls,
            CliProtocol::HttpsWire => Protocol::HttpsWire,
            CliProtocol::HttpsJson => Protocol::HttpsJson,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let protocol: Protocol = args.protocol.into();
    let config = ResolverConfig { prefer_ipv6: args.ipv6, protocol, recursive_protocol: protocol, ..Default::default() };
    let resolver = IterativeResolver::new(config);

    let servers = match args.server {
        Some(text) => Some(vec![NameServer::parse(&text, protocol)?]),
        None => None,
    };

    let qtype = if args.ipv6 { TYPE_AAAA } else { TYPE_A };
    let question = DnsQuestion::new(Name::from_dotted(&args.name), qtype, CLASS_IN);

    let response = resolver.resolve(question, servers, None, None).await?;

    println!("rcode: {}", response.rcode());
    for rr in &response.answer {
        println!("{}\t{}\t{:?}", rr.name, rr.ttl, rr.rdata);
    }
    if response.answer.is_empty() {
        println!("(no answers; {} authority record(s))", response.authority.len());
    }

    Ok(())
}
