#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const VIA: &str = "1.1 intermediate-proxy";

/// HTTP proxy that sends every request, whatever its host, to one upstream.
///
/// Forwarded requests get a `Via` header; CONNECT tunnels are relayed untouched.
pub struct IntermediateProxy {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    _handle: JoinHandle<()>,
}

impl IntermediateProxy {
    pub async fn start(upstream: SocketAddr) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(Self::handle_connection(socket, upstream, recorded.clone()));
            }
        });

        Ok(Self {
            addr,
            requests,
            _handle: handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request lines received so far, e.g. `GET http://example.local/test HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    async fn handle_connection(socket: TcpStream, upstream: SocketAddr, requests: Arc<Mutex<Vec<String>>>) {
        let mut reader = BufReader::new(socket);
        let mut head = Vec::new();
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            if line == "\r\n" || line == "\n" {
                break;
            }
            head.push(line.trim_end().to_string());
        }
        let Some(first_line) = head.first().cloned() else {
            return;
        };
        eprintln!("[IntermediateProxy] {}", first_line);
        requests.lock().unwrap().push(first_line.clone());

        let parts: Vec<&str> = first_line.split_whitespace().collect();
        if parts.len() < 3 {
            return;
        }
        let mut client = reader.into_inner();
        let mut server = match TcpStream::connect(upstream).await {
            Ok(server) => server,
            Err(_) => {
                let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
                return;
            }
        };

        if parts[0] == "CONNECT" {
            if client
                .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                .await
                .is_ok()
            {
                let _ = tokio::io::copy_bidirectional(&mut client, &mut server).await;
            }
            return;
        }

        let request = Self::reconstruct_http_request(parts[0], parts[1], parts[2], &head[1..]);
        if server.write_all(request.as_bytes()).await.is_ok() {
            let _ = tokio::io::copy(&mut server, &mut client).await;
        }
        let _ = client.shutdown().await;
    }

    /// Origin-form request with `Via` added and the connection closed after one exchange.
    fn reconstruct_http_request(method: &str, target: &str, version: &str, headers: &[String]) -> String {
        let path = match target.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
            None => target,
        };

        let mut reconstructed = format!("{} {} {}\r\n", method, path, version);
        for line in headers {
            let name = line.split(':').next().unwrap_or_default().trim().to_ascii_lowercase();
            if matches!(name.as_str(), "connection" | "proxy-connection" | "proxy-authorization") {
                continue;
            }
            reconstructed.push_str(line);
            reconstructed.push_str("\r\n");
        }
        reconstructed.push_str(&format!("Via: {}\r\n", VIA));
        reconstructed.push_str("Connection: close\r\n\r\n");
        reconstructed
    }
}
