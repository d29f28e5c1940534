use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tokio_socks::TargetAddr;

use super::dial::{resolve, within, ProxyEndpoint};
use super::{ensure_open, secure_target, TlsConfigs};
use crate::domain::{
    ConnectorOptions, Credentials, ProxyError, ProxyRoute, ProxyScheme, Result, TargetRequest, TransportKind,
};
use crate::ports::{BoxedIo, Connector};

/// SOCKS4/4a/5/5h connector. The `a`/`h` variants let the proxy resolve
/// host names; the others resolve them here first.
pub struct SocksConnector {
    endpoint: ProxyEndpoint,
    options: ConnectorOptions,
    tls: Arc<TlsConfigs>,
    credentials: Option<Credentials>,
    closed: AtomicBool,
}

impl SocksConnector {
    pub(crate) fn new(endpoint: ProxyEndpoint, options: ConnectorOptions, tls: Arc<TlsConfigs>) -> Self {
        let credentials = endpoint.credentials.clone();
        Self {
            endpoint,
            options,
            tls,
            credentials,
            closed: AtomicBool::new(false),
        }
    }

    async fn target_addr(&self, request: &TargetRequest) -> Result<TargetAddr<'static>> {
        let host = request.host();
        if self.endpoint.scheme.resolves_remotely() {
            if let Ok(ip) = host.parse::<std::net::IpAddr>() {
                return Ok(TargetAddr::Ip((ip, request.port()).into()));
            }
            return Ok(TargetAddr::Domain(host.into(), request.port()));
        }
        let addrs = resolve(&host, request.port()).await?;
        let addr = match self.endpoint.scheme {
            ProxyScheme::Socks4 => addrs.iter().find(|a| a.is_ipv4()).copied(),
            _ => addrs.first().copied(),
        };
        addr.map(TargetAddr::Ip)
            .ok_or_else(|| ProxyError::ConnectionFailed(format!("no usable address for {}", host)))
    }

    async fn establish(&self, request: &TargetRequest) -> Result<BoxedIo> {
        let target = self.target_addr(request).await?;
        let socket = self.endpoint.tcp(&self.options).await?;
        let failed = |e: tokio_socks::Error| ProxyError::proxy_connect(&self.endpoint.url, &request.url, e);

        let stream: BoxedIo = match (self.endpoint.scheme, &self.credentials) {
            (ProxyScheme::Socks4 | ProxyScheme::Socks4a, Some(creds)) => Box::new(
                Socks4Stream::connect_with_userid_and_socket(socket, target, &creds.username)
                    .await
                    .map_err(failed)?,
            ),
            (ProxyScheme::Socks4 | ProxyScheme::Socks4a, None) => {
                Box::new(Socks4Stream::connect_with_socket(socket, target).await.map_err(failed)?)
            }
            (_, Some(creds)) => Box::new(
                Socks5Stream::connect_with_password_and_socket(socket, target, &creds.username, &creds.password)
                    .await
                    .map_err(failed)?,
            ),
            (_, None) => Box::new(Socks5Stream::connect_with_socket(socket, target).await.map_err(failed)?),
        };
        debug!("SOCKS tunnel to {} established", request.authority());
        secure_target(stream, request, &self.tls).await
    }
}

#[async_trait]
impl Connector for SocksConnector {
    fn route(&self) -> ProxyRoute {
        ProxyRoute::Proxied {
            proxy_url: self.endpoint.url.clone(),
            kind: TransportKind::Socks,
        }
    }

    async fn connect(&self, request: &TargetRequest) -> Result<BoxedIo> {
        ensure_open(&self.closed)?;
        within(self.options.connect_timeout, "establishing SOCKS tunnel", self.establish(request)).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal no-auth SOCKS5 server that records the requested address and echoes.
    async fn fake_socks5() -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut greeting = [0u8; 2];
            socket.read_exact(&mut greeting).await.unwrap();
            let mut methods = vec![0u8; greeting[1] as usize];
            socket.read_exact(&mut methods).await.unwrap();
            socket.write_all(&[5, 0]).await.unwrap();

            let mut header = [0u8; 4];
            socket.read_exact(&mut header).await.unwrap();
            let mut request = header.to_vec();
            match header[3] {
                3 => {
                    let mut len = [0u8; 1];
                    socket.read_exact(&mut len).await.unwrap();
                    let mut rest = vec![0u8; len[0] as usize + 2];
                    socket.read_exact(&mut rest).await.unwrap();
                    request.push(len[0]);
                    request.extend(rest);
                }
                _ => {
                    let mut rest = [0u8; 6];
                    socket.read_exact(&mut rest).await.unwrap();
                    request.extend(rest);
                }
            }
            socket.write_all(&[5, 0, 0, 1, 127, 0, 0, 1, 0, 80]).await.unwrap();

            let mut echo = [0u8; 4];
            socket.read_exact(&mut echo).await.unwrap();
            socket.write_all(&echo).await.unwrap();
            request
        });
        (format!("socks5h://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_socks5h_sends_hostname() {
        let (url, server) = fake_socks5().await;
        let endpoint = ProxyEndpoint::resolve(&url.parse().unwrap()).await.unwrap();
        let tls = Arc::new(TlsConfigs::new().unwrap());
        let connector = SocksConnector::new(endpoint, ConnectorOptions::default(), tls);
        let request = TargetRequest::new("ws://chat.example.com:8080/".parse().unwrap()).unwrap();

        let mut stream = connector.connect(&request).await.unwrap();
        stream.write_all(b"ping").await.unwrap();
        let mut pong = [0u8; 4];
        stream.read_exact(&mut pong).await.unwrap();

        let sent = server.await.unwrap();
        assert_eq!(&pong, b"ping");
        assert_eq!(sent[3], 3);
        assert_eq!(&sent[5..5 + sent[4] as usize], b"chat.example.com");
        assert_eq!(&sent[sent.len() - 2..], &8080u16.to_be_bytes());
    }
}
