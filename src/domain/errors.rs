use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// A proxy URL, override result or option could not be used as given.
    Configuration(String),
    UnsupportedProxyProtocol(String),
    /// The connector for `proxy` failed to reach `target`.
    ProxyConnect {
        proxy: String,
        target: String,
        reason: String,
    },
    InvalidUri(String),
    ConnectionFailed(String),
    Tls(String),
    ResolutionFailed(String),
    Closed,
}

impl ProxyError {
    pub fn proxy_connect(proxy: &url::Url, target: &url::Url, reason: impl fmt::Display) -> Self {
        ProxyError::ProxyConnect {
            proxy: redact(proxy),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Renders a proxy URL without its password so it can land in errors and logs.
pub fn redact(url: &url::Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut shown = url.clone();
    let _ = shown.set_password(Some("***"));
    shown.to_string()
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Configuration(msg) => write!(f, "Invalid proxy configuration: {}", msg),
            ProxyError::UnsupportedProxyProtocol(scheme) => {
                write!(f, "Unsupported proxy protocol: {}", scheme)
            }
            ProxyError::ProxyConnect { proxy, target, reason } => {
                write!(f, "Failed to reach {} through proxy {}: {}", target, proxy, reason)
            }
            ProxyError::InvalidUri(msg) => write!(f, "Invalid URI: {}", msg),
            ProxyError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ProxyError::Tls(msg) => write!(f, "TLS handshake failed: {}", msg),
            ProxyError::ResolutionFailed(msg) => write!(f, "Proxy resolution failed: {}", msg),
            ProxyError::Closed => write!(f, "Connector has been closed"),
        }
    }
}

impl std::error::Error for ProxyError {}

pub type Result<T> = std::result::Result<T, ProxyError>;
