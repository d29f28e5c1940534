use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::dial::{connect_any, resolve};
use super::{ensure_open, secure_target, TlsConfigs};
use crate::domain::{ConnectorOptions, ProxyRoute, Result, TargetRequest};
use crate::ports::{BoxedIo, Connector};

/// Connects straight to the target, resolving its host on every call.
pub struct DirectConnector {
    options: ConnectorOptions,
    tls: Arc<TlsConfigs>,
    closed: AtomicBool,
}

impl DirectConnector {
    pub fn new(options: ConnectorOptions, tls: Arc<TlsConfigs>) -> Self {
        Self {
            options,
            tls,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connector for DirectConnector {
    fn route(&self) -> ProxyRoute {
        ProxyRoute::Direct
    }

    async fn connect(&self, request: &TargetRequest) -> Result<BoxedIo> {
        ensure_open(&self.closed)?;
        let addrs = resolve(&request.host(), request.port()).await?;
        let stream = connect_any(&addrs, &self.options).await?;
        debug!("Direct connection to {} established", request.authority());
        secure_target(stream, request, &self.tls).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProxyError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_direct_connects_to_target_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let connector = DirectConnector::new(ConnectorOptions::default(), Arc::new(TlsConfigs::new().unwrap()));
        let request = TargetRequest::new(format!("http://127.0.0.1:{}/", port).parse().unwrap()).unwrap();
        let mut stream = connector.connect(&request).await.unwrap();
        stream.write_all(b"hello").await.unwrap();

        assert_eq!(&server.await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_closed_connector_refuses() {
        let connector = DirectConnector::new(ConnectorOptions::default(), Arc::new(TlsConfigs::new().unwrap()));
        connector.close().await;

        let request = TargetRequest::new("http://127.0.0.1:9/".parse().unwrap()).unwrap();
        assert_eq!(connector.connect(&request).await.err(), Some(ProxyError::Closed));
    }
}
