use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper_util::client::legacy::connect::{Connected, Connection};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use uuid::Uuid;

use crate::domain::{ProxyRoute, TransportKind};
use crate::ports::{BoxedIo, Connector, TrackingPort};

/// Marks a tracked connection closed when dropped.
pub(crate) struct TrackingGuard {
    id: Uuid,
    tracker: Arc<dyn TrackingPort>,
}

impl TrackingGuard {
    pub(crate) fn new(id: Uuid, tracker: Arc<dyn TrackingPort>) -> Self {
        Self { id, tracker }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.tracker.close_connection(self.id);
    }
}

/// Stream handed out by the dispatcher.
///
/// Holds a lease on the connector that produced it, so the connector
/// outlives every connection obtained from it.
pub struct ProxyConnection {
    inner: BoxedIo,
    route: ProxyRoute,
    proxy_authorization: Option<String>,
    _lease: Arc<dyn Connector>,
    tracking: Option<TrackingGuard>,
}

impl ProxyConnection {
    pub fn new(inner: BoxedIo, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner,
            route: connector.route(),
            proxy_authorization: connector.proxy_authorization(),
            _lease: connector,
            tracking: None,
        }
    }

    pub(crate) fn tracked(mut self, guard: TrackingGuard) -> Self {
        self.tracking = Some(guard);
        self
    }

    pub fn route(&self) -> &ProxyRoute {
        &self.route
    }

    /// Whether requests on this stream must be written in absolute form.
    pub fn is_forwarding(&self) -> bool {
        self.route.kind() == Some(TransportKind::HttpTunnel)
    }

    pub fn proxy_authorization(&self) -> Option<&str> {
        self.proxy_authorization.as_deref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.tracking.as_ref().map(|guard| guard.id)
    }
}

impl fmt::Debug for ProxyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConnection")
            .field("route", &self.route)
            .field("id", &self.id())
            .finish()
    }
}

impl AsyncRead for ProxyConnection {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for ProxyConnection {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Connection for ProxyConnection {
    fn connected(&self) -> Connected {
        Connected::new().proxy(self.is_forwarding())
    }
}
