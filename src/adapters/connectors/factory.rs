use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use url::Url;

use super::dial::ProxyEndpoint;
use super::{DirectConnector, HttpConnectConnector, HttpForwardConnector, SocksConnector, TlsConfigs};
use crate::domain::{redact, ConnectorOptions, ProxyError, Result, TransportKind};
use crate::ports::{Connector, ConnectorFactory};

/// Builds the stock connectors. Construction resolves the proxy host, so a
/// proxy that does not resolve fails here rather than on first use.
#[derive(Clone)]
pub struct DefaultConnectorFactory {
    tls: Arc<TlsConfigs>,
}

impl DefaultConnectorFactory {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tls: Arc::new(TlsConfigs::new()?),
        })
    }

    pub fn direct(&self, options: ConnectorOptions) -> DirectConnector {
        DirectConnector::new(options, self.tls.clone())
    }
}

#[async_trait]
impl ConnectorFactory for DefaultConnectorFactory {
    async fn create(
        &self,
        proxy_url: &Url,
        kind: TransportKind,
        options: &ConnectorOptions,
    ) -> Result<Arc<dyn Connector>> {
        let endpoint = ProxyEndpoint::resolve(proxy_url).await?;
        if endpoint.scheme.is_socks() != (kind == TransportKind::Socks) {
            return Err(ProxyError::Configuration(format!(
                "{} cannot carry a {} connection",
                redact(proxy_url),
                kind
            )));
        }
        info!("Creating {} connector for {}", kind, redact(proxy_url));

        let options = options.clone();
        let tls = self.tls.clone();
        let connector: Arc<dyn Connector> = match kind {
            TransportKind::HttpTunnel => Arc::new(HttpForwardConnector::new(endpoint, options, tls)),
            TransportKind::HttpsTunnel => Arc::new(HttpConnectConnector::new(endpoint, options, tls)),
            TransportKind::Socks => Arc::new(SocksConnector::new(endpoint, options, tls)),
        };
        Ok(connector)
    }
}
