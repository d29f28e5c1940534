use futures::Future;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;
use url::Url;

use crate::connection::ProxyConnection;
use crate::domain::{ProxyDispatcher, ProxyError, RequestOptions, TargetRequest};

/// Plugs a dispatcher into `hyper_util::client::legacy::Client`.
#[derive(Clone)]
pub struct HyperConnector {
    dispatcher: Arc<ProxyDispatcher>,
    options: RequestOptions,
}

impl HyperConnector {
    pub fn new(dispatcher: Arc<ProxyDispatcher>) -> Self {
        Self {
            dispatcher,
            options: RequestOptions::default(),
        }
    }

    /// Options applied to every connection this connector opens.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

impl Service<Uri> for HyperConnector {
    type Response = HyperStream;
    type Error = ProxyError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        let options = self.options.clone();

        Box::pin(async move {
            let url: Url = uri
                .to_string()
                .parse()
                .map_err(|e| ProxyError::InvalidUri(format!("{}: {}", uri, e)))?;
            let request = TargetRequest::new(url)?.with_options(options);

            let conn = dispatcher.connect(&request).await?;
            log::debug!("{} connected ({})", uri, conn.route());
            Ok(HyperStream {
                io: TokioIo::new(conn),
            })
        })
    }
}

/// hyper-facing view of a [`ProxyConnection`].
pub struct HyperStream {
    io: TokioIo<ProxyConnection>,
}

impl HyperStream {
    pub fn connection(&self) -> &ProxyConnection {
        self.io.inner()
    }
}

impl Read for HyperStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: ReadBufCursor<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl Write for HyperStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

impl Connection for HyperStream {
    fn connected(&self) -> Connected {
        self.io.inner().connected()
    }
}
