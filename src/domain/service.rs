use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::{classify, AgentCache, CacheKey, ConnectionInfo, ProxyError, ProxyUrlResolver, Result, TargetRequest};
use crate::connection::{ProxyConnection, TrackingGuard};
use crate::ports::{Connector, ConnectorFactory, TrackingPort};

/// Per-request entry point: resolves the proxy, picks or builds the
/// connector for it and hands back a ready stream.
pub struct ProxyDispatcher {
    resolver: ProxyUrlResolver,
    factory: Arc<dyn ConnectorFactory>,
    direct: Arc<dyn Connector>,
    cache: AgentCache,
    tracker: Arc<dyn TrackingPort>,
}

impl ProxyDispatcher {
    pub fn new(
        resolver: ProxyUrlResolver,
        factory: Arc<dyn ConnectorFactory>,
        direct: Arc<dyn Connector>,
        tracker: Arc<dyn TrackingPort>,
    ) -> Self {
        Self {
            resolver,
            factory,
            direct,
            cache: AgentCache::new(),
            tracker,
        }
    }

    pub fn cache(&self) -> &AgentCache {
        &self.cache
    }

    pub fn resolver(&self) -> &ProxyUrlResolver {
        &self.resolver
    }

    pub async fn resolve(&self, request: &TargetRequest) -> Result<Option<Url>> {
        self.resolver.resolve(request).await
    }

    pub async fn connect(&self, request: &TargetRequest) -> Result<ProxyConnection> {
        let conn = match self.resolver.resolve(request).await? {
            None => {
                debug!(url = %request.url, "connecting directly");
                let stream = self.direct.connect(request).await?;
                ProxyConnection::new(stream, self.direct.clone())
            }
            Some(proxy_url) => {
                let connector = self.proxied_connector(&proxy_url, request).await?;
                let stream = connector
                    .connect(request)
                    .await
                    .map_err(|e| wrap_proxy_error(&proxy_url, request, e))?;
                ProxyConnection::new(stream, connector)
            }
        };
        self.track(request, conn).await
    }

    /// Closes every cached connector. Connections already handed out keep working.
    pub async fn close(&self) {
        info!("closing dispatcher");
        self.cache.evict_all().await;
    }

    pub async fn active_connections(&self) -> Result<Vec<ConnectionInfo>> {
        self.tracker.get_active_connections().await
    }

    async fn proxied_connector(&self, proxy_url: &Url, request: &TargetRequest) -> Result<Arc<dyn Connector>> {
        let kind = classify(proxy_url, request.protocol)?;
        let key = CacheKey::new(proxy_url, request.protocol);
        debug!(url = %request.url, key = %key, kind = %kind, "dispatching through proxy");

        let factory = self.factory.clone();
        let options = self.resolver.config().connector.clone();
        let url = proxy_url.clone();
        self.cache
            .get_or_create(&key, move || async move { factory.create(&url, kind, &options).await })
            .await
            .map_err(|e| wrap_proxy_error(proxy_url, request, e))
    }

    async fn track(&self, request: &TargetRequest, conn: ProxyConnection) -> Result<ProxyConnection> {
        let info = ConnectionInfo::new(request.url.to_string(), conn.route().to_string());
        let id = info.id;
        self.tracker.track_connection(info).await?;
        Ok(conn.tracked(TrackingGuard::new(id, self.tracker.clone())))
    }
}

fn wrap_proxy_error(proxy_url: &Url, request: &TargetRequest, error: ProxyError) -> ProxyError {
    match error {
        ProxyError::Configuration(_) | ProxyError::UnsupportedProxyProtocol(_) | ProxyError::ProxyConnect { .. } => {
            error
        }
        other => ProxyError::proxy_connect(proxy_url, &request.url, other),
    }
}
