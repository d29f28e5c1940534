use std::fmt;
use url::Url;

use super::{ProxyError, Result, TargetProtocol};

/// Proxy flavours recognized by scheme. `socks` is an alias of `socks5h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyScheme {
    Http,
    Https,
    Socks4,
    Socks4a,
    Socks5,
    Socks5h,
}

impl ProxyScheme {
    pub fn classify(proxy_url: &Url) -> Result<Self> {
        match proxy_url.scheme() {
            "http" => Ok(ProxyScheme::Http),
            "https" => Ok(ProxyScheme::Https),
            "socks4" => Ok(ProxyScheme::Socks4),
            "socks4a" => Ok(ProxyScheme::Socks4a),
            "socks5" => Ok(ProxyScheme::Socks5),
            "socks" | "socks5h" => Ok(ProxyScheme::Socks5h),
            other => Err(ProxyError::UnsupportedProxyProtocol(other.to_string())),
        }
    }

    pub fn is_socks(&self) -> bool {
        !matches!(self, ProxyScheme::Http | ProxyScheme::Https)
    }

    /// Whether the hop to the proxy itself runs over TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self, ProxyScheme::Https)
    }

    /// Whether the proxy, rather than this side, resolves the target host name.
    pub fn resolves_remotely(&self) -> bool {
        !matches!(self, ProxyScheme::Socks4 | ProxyScheme::Socks5)
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ProxyScheme::Http => 80,
            ProxyScheme::Https => 443,
            _ => 1080,
        }
    }
}

/// Connector families a proxied connection can be carried by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Plain requests forwarded in absolute form to an HTTP(S) proxy.
    HttpTunnel,
    /// CONNECT tunnel through an HTTP(S) proxy.
    HttpsTunnel,
    Socks,
}

impl TransportKind {
    pub fn select(scheme: ProxyScheme, target: TargetProtocol) -> Self {
        if scheme.is_socks() {
            return TransportKind::Socks;
        }
        match target {
            TargetProtocol::Http => TransportKind::HttpTunnel,
            TargetProtocol::Https | TargetProtocol::Ws | TargetProtocol::Wss => TransportKind::HttpsTunnel,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::HttpTunnel => write!(f, "http-tunnel"),
            TransportKind::HttpsTunnel => write!(f, "https-tunnel"),
            TransportKind::Socks => write!(f, "socks"),
        }
    }
}

/// Maps a proxy URL and the target protocol to the connector family that must carry it.
pub fn classify(proxy_url: &Url, target: TargetProtocol) -> Result<TransportKind> {
    let scheme = ProxyScheme::classify(proxy_url)?;
    Ok(TransportKind::select(scheme, target))
}
