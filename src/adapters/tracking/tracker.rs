use crate::domain::{ConnectionInfo, Result};
use crate::ports::TrackingPort;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Connection tracker implementation
///
/// Holds live connections only: an entry leaves the map as soon as its
/// connection is dropped.
pub struct ConnectionTracker {
    connections: RwLock<HashMap<Uuid, ConnectionInfo>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.read().map(|conns| conns.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingPort for ConnectionTracker {
    async fn track_connection(&self, info: ConnectionInfo) -> Result<()> {
        info!("{} (via {})", info.target, info.route);

        if let Ok(mut conns) = self.connections.write() {
            conns.insert(info.id, info);
        }
        Ok(())
    }

    fn close_connection(&self, id: Uuid) {
        let closed = self.connections.write().ok().and_then(|mut conns| conns.remove(&id));
        if let Some(conn) = closed {
            debug!("{} closed after {:?}", conn.target, conn.opened_at.elapsed());
        }
    }

    async fn get_active_connections(&self) -> Result<Vec<ConnectionInfo>> {
        Ok(self
            .connections
            .read()
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DefaultConnectorFactory, MapEnv};
    use crate::domain::{ConnectorOptions, ProxyConfig, ProxyDispatcher, ProxyUrlResolver, TargetRequest};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_closed_connections_are_not_active() {
        let tracker = ConnectionTracker::new();
        let first = ConnectionInfo::new("http://a.example.com/".into(), "direct".into());
        let second = ConnectionInfo::new(
            "https://b.example.com/".into(),
            "https-tunnel via http://p:3128/".into(),
        );
        let first_id = first.id;

        tracker.track_connection(first).await.unwrap();
        tracker.track_connection(second).await.unwrap();
        tracker.close_connection(first_id);

        let active = tracker.get_active_connections().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].target, "https://b.example.com/");
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_connections_leave_the_tracker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let tracker = Arc::new(ConnectionTracker::new());
        let factory = DefaultConnectorFactory::new().unwrap();
        let direct = Arc::new(factory.direct(ConnectorOptions::default()));
        let dispatcher = ProxyDispatcher::new(
            ProxyUrlResolver::new(ProxyConfig::new(), Arc::new(MapEnv::new())),
            Arc::new(factory),
            direct,
            tracker.clone(),
        );
        let request = TargetRequest::new(format!("http://{}/", addr).parse().unwrap()).unwrap();

        let held = dispatcher.connect(&request).await.unwrap();
        for _ in 0..50 {
            drop(dispatcher.connect(&request).await.unwrap());
        }

        assert_eq!(tracker.len(), 1);
        assert_eq!(dispatcher.active_connections().await.unwrap().len(), 1);
        drop(held);
        assert!(tracker.is_empty());
    }
}
