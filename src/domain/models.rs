use std::collections::HashMap;
use std::fmt;
use percent_encoding::percent_decode_str;
use url::{Host, Url};

use super::{redact, ProxyError, Result, TransportKind};

/// Protocol of the endpoint a connection is ultimately meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProtocol {
    Http,
    Https,
    Ws,
    Wss,
}

impl TargetProtocol {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(TargetProtocol::Http),
            "https" => Some(TargetProtocol::Https),
            "ws" => Some(TargetProtocol::Ws),
            "wss" => Some(TargetProtocol::Wss),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetProtocol::Http => "http",
            TargetProtocol::Https => "https",
            TargetProtocol::Ws => "ws",
            TargetProtocol::Wss => "wss",
        }
    }

    /// Whether the target expects TLS end to end, whatever the proxy hop looks like.
    pub fn is_secure(&self) -> bool {
        matches!(self, TargetProtocol::Https | TargetProtocol::Wss)
    }

    pub fn default_port(&self) -> u16 {
        if self.is_secure() {
            443
        } else {
            80
        }
    }
}

impl fmt::Display for TargetProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub reject_unauthorized: bool,
    /// Name presented in SNI and checked against the certificate, defaults to the target host.
    pub server_name: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            reject_unauthorized: true,
            server_name: None,
        }
    }
}

/// Per-call options. They are forwarded to the connector on every call and
/// never take part in connector identity.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub tls: TlsOptions,
    /// Extra headers for the proxy hop (sent with CONNECT).
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub url: Url,
    pub protocol: TargetProtocol,
    pub options: RequestOptions,
}

impl TargetRequest {
    pub fn new(url: Url) -> Result<Self> {
        let protocol = TargetProtocol::from_scheme(url.scheme())
            .ok_or_else(|| ProxyError::InvalidUri(format!("Unsupported target scheme: {}", url.scheme())))?;
        if url.host().is_none() {
            return Err(ProxyError::InvalidUri(format!("Missing host in {}", url)));
        }
        Ok(Self {
            url,
            protocol,
            options: RequestOptions::default(),
        })
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.options.tls = tls;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.options.headers = headers;
        self
    }

    /// Host without IPv6 brackets, suitable for socket and TLS APIs.
    pub fn host(&self) -> String {
        match self.url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.url.port().unwrap_or_else(|| self.protocol.default_port())
    }

    /// `host:port` as written in a CONNECT request line.
    pub fn authority(&self) -> String {
        match self.url.host() {
            Some(Host::Ipv6(addr)) => format!("[{}]:{}", addr, self.port()),
            _ => format!("{}:{}", self.host(), self.port()),
        }
    }

    pub fn tls_server_name(&self) -> String {
        self.options.tls.server_name.clone().unwrap_or_else(|| self.host())
    }
}

/// Identity of one cached connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub proxy_url: String,
    pub protocol: TargetProtocol,
}

impl CacheKey {
    pub fn new(proxy_url: &Url, protocol: TargetProtocol) -> Self {
        Self {
            proxy_url: proxy_url.to_string(),
            protocol,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.protocol, self.proxy_url)
    }
}

#[derive(Debug, Clone)]
pub enum ProxyRoute {
    Direct,
    Proxied { proxy_url: Url, kind: TransportKind },
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRoute::Direct => write!(f, "direct"),
            ProxyRoute::Proxied { proxy_url, kind } => {
                write!(f, "{} via {}", kind, super::errors::redact(proxy_url))
            }
        }
    }
}

impl ProxyRoute {
    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyRoute::Direct)
    }

    pub fn kind(&self) -> Option<TransportKind> {
        match self {
            ProxyRoute::Direct => None,
            ProxyRoute::Proxied { kind, .. } => Some(*kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Percent-decoded userinfo of a proxy URL, if it carries a user name.
    pub fn from_url(url: &Url) -> Result<Option<Self>> {
        if url.username().is_empty() {
            return Ok(None);
        }
        let username = decode_userinfo(url.username(), url)?;
        let password = decode_userinfo(url.password().unwrap_or_default(), url)?;
        Ok(Some(Self::new(username, password)))
    }

    pub fn to_basic_auth(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", base64::prelude::BASE64_STANDARD.encode(credentials))
    }
}

fn decode_userinfo(raw: &str, url: &Url) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ProxyError::Configuration(format!("{}: userinfo is not valid UTF-8", redact(url))))
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: uuid::Uuid,
    pub target: String,
    pub route: String,
    pub opened_at: std::time::Instant,
}

impl ConnectionInfo {
    pub fn new(target: String, route: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            target,
            route,
            opened_at: std::time::Instant::now(),
        }
    }
}
