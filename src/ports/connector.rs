use std::sync::Arc;

use crate::domain::{ConnectorOptions, ProxyRoute, Result, TargetRequest, TransportKind};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;

/// Byte stream handed back by a connector, ready for application data.
pub trait ProxyIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ProxyIo for T {}

pub type BoxedIo = Box<dyn ProxyIo>;

/// Port for a reusable connector bound to one proxy and target protocol
/// (or to no proxy at all, for direct connections).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Route every connection from this connector takes
    fn route(&self) -> ProxyRoute;

    /// Open a stream to the request's target
    ///
    /// Per-request options (TLS verification, CONNECT headers) are read from
    /// `request` on every call.
    async fn connect(&self, request: &TargetRequest) -> Result<BoxedIo>;

    /// Release what the connector holds; later `connect` calls fail
    async fn close(&self);

    /// `Proxy-Authorization` value the HTTP layer should attach to forwarded requests
    fn proxy_authorization(&self) -> Option<String> {
        None
    }
}

/// Port for building protocol-specific connectors
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn create(
        &self,
        proxy_url: &Url,
        kind: TransportKind,
        options: &ConnectorOptions,
    ) -> Result<Arc<dyn Connector>>;
}
