use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::dial::{within, ProxyEndpoint};
use super::{ensure_open, TlsConfigs};
use crate::domain::{ConnectorOptions, Credentials, ProxyRoute, Result, TargetRequest, TransportKind};
use crate::ports::{BoxedIo, Connector};

/// Hands out streams to an HTTP(S) proxy on which plain requests are
/// written in absolute form.
pub struct HttpForwardConnector {
    endpoint: ProxyEndpoint,
    options: ConnectorOptions,
    tls: Arc<TlsConfigs>,
    authorization: Option<String>,
    closed: AtomicBool,
}

impl HttpForwardConnector {
    pub(crate) fn new(endpoint: ProxyEndpoint, options: ConnectorOptions, tls: Arc<TlsConfigs>) -> Self {
        let authorization = endpoint.credentials.as_ref().map(Credentials::to_basic_auth);
        Self {
            endpoint,
            options,
            tls,
            authorization,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connector for HttpForwardConnector {
    fn route(&self) -> ProxyRoute {
        ProxyRoute::Proxied {
            proxy_url: self.endpoint.url.clone(),
            kind: TransportKind::HttpTunnel,
        }
    }

    async fn connect(&self, request: &TargetRequest) -> Result<BoxedIo> {
        ensure_open(&self.closed)?;
        let stream = within(
            self.options.connect_timeout,
            "opening forwarding connection",
            self.endpoint.open(&self.options, &self.tls),
        )
        .await?;
        debug!("Forwarding {} through {}", request.url, self.endpoint.url.host_str().unwrap_or_default());
        Ok(stream)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn proxy_authorization(&self) -> Option<String> {
        self.authorization.clone()
    }
}
