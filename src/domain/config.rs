use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::TlsOptions;
use crate::ports::{AsyncProxyHook, ProxyForUrl, SyncProxyHook};

/// Options a dispatcher recognizes, with their conventional variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOption {
    Http,
    Https,
    Ws,
    Wss,
    All,
    NoProxy,
}

impl ProxyOption {
    pub fn env_name(&self) -> &'static str {
        match self {
            ProxyOption::Http => "http_proxy",
            ProxyOption::Https => "https_proxy",
            ProxyOption::Ws => "ws_proxy",
            ProxyOption::Wss => "wss_proxy",
            ProxyOption::All => "all_proxy",
            ProxyOption::NoProxy => "no_proxy",
        }
    }
}

/// Applied to every connector a dispatcher constructs.
#[derive(Debug, Clone)]
pub struct ConnectorOptions {
    pub connect_timeout: Option<Duration>,
    pub nodelay: bool,
    /// TLS settings for the hop to an `https://` proxy.
    pub proxy_tls: TlsOptions,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            nodelay: true,
            proxy_tls: TlsOptions::default(),
        }
    }
}

/// Explicit proxy configuration of one dispatcher.
///
/// Options left unset here are read from the environment on every
/// resolution; an explicit empty string disables the option without
/// consulting the environment.
#[derive(Clone, Default)]
pub struct ProxyConfig {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub ws_proxy: Option<String>,
    pub wss_proxy: Option<String>,
    pub all_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub proxy_for_url: Option<Arc<dyn ProxyForUrl>>,
    pub connector: ConnectorOptions,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.http_proxy = Some(proxy.into());
        self
    }

    pub fn with_https_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.https_proxy = Some(proxy.into());
        self
    }

    pub fn with_ws_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.ws_proxy = Some(proxy.into());
        self
    }

    pub fn with_wss_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.wss_proxy = Some(proxy.into());
        self
    }

    pub fn with_all_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.all_proxy = Some(proxy.into());
        self
    }

    pub fn with_no_proxy(mut self, pattern: impl Into<String>) -> Self {
        self.no_proxy = Some(pattern.into());
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ProxyForUrl>) -> Self {
        self.proxy_for_url = Some(hook);
        self
    }

    pub fn with_proxy_for_url<F>(self, hook: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(SyncProxyHook(hook)))
    }

    pub fn with_async_proxy_for_url<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        self.with_hook(Arc::new(AsyncProxyHook(hook)))
    }

    pub fn with_connector_options(mut self, options: ConnectorOptions) -> Self {
        self.connector = options;
        self
    }

    pub fn explicit(&self, option: ProxyOption) -> Option<&str> {
        match option {
            ProxyOption::Http => self.http_proxy.as_deref(),
            ProxyOption::Https => self.https_proxy.as_deref(),
            ProxyOption::Ws => self.ws_proxy.as_deref(),
            ProxyOption::Wss => self.wss_proxy.as_deref(),
            ProxyOption::All => self.all_proxy.as_deref(),
            ProxyOption::NoProxy => self.no_proxy.as_deref(),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("http_proxy", &self.http_proxy)
            .field("https_proxy", &self.https_proxy)
            .field("ws_proxy", &self.ws_proxy)
            .field("wss_proxy", &self.wss_proxy)
            .field("all_proxy", &self.all_proxy)
            .field("no_proxy", &self.no_proxy)
            .field("proxy_for_url", &self.proxy_for_url.is_some())
            .field("connector", &self.connector)
            .finish()
    }
}

/// On-disk settings of the `proxy-dispatch` binary.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub ws_proxy: Option<String>,
    pub wss_proxy: Option<String>,
    pub all_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub pac_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub insecure: bool,
}

impl DispatchSettings {
    /// Explicit options only. The PAC hook, if any, is attached by the caller.
    pub fn to_config(&self) -> ProxyConfig {
        let mut connector = ConnectorOptions::default();
        if let Some(ms) = self.connect_timeout_ms {
            connector.connect_timeout = Some(Duration::from_millis(ms));
        }
        connector.proxy_tls.reject_unauthorized = !self.insecure;

        ProxyConfig {
            http_proxy: self.http_proxy.clone(),
            https_proxy: self.https_proxy.clone(),
            ws_proxy: self.ws_proxy.clone(),
            wss_proxy: self.wss_proxy.clone(),
            all_proxy: self.all_proxy.clone(),
            no_proxy: self.no_proxy.clone(),
            proxy_for_url: None,
            connector,
        }
    }
}
