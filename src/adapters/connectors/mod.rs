mod dial;
mod direct;
mod factory;
mod http_connect;
mod http_forward;
mod socks;
mod tls;

pub use direct::DirectConnector;
pub use factory::DefaultConnectorFactory;
pub use http_connect::HttpConnectConnector;
pub use http_forward::HttpForwardConnector;
pub use socks::SocksConnector;
pub use tls::{NoVerifier, TlsConfigs};

use crate::domain::{ProxyError, Result, TargetRequest};
use crate::ports::{BoxedIo, ProxyIo};
use std::sync::atomic::{AtomicBool, Ordering};

/// Layers end-to-end TLS over an established path when the target expects it.
async fn secure_target<S>(stream: S, request: &TargetRequest, tls: &TlsConfigs) -> Result<BoxedIo>
where
    S: ProxyIo + 'static,
{
    if !request.protocol.is_secure() {
        return Ok(Box::new(stream));
    }
    let stream = tls
        .handshake(stream, &request.tls_server_name(), &request.options.tls)
        .await?;
    Ok(Box::new(stream))
}

fn ensure_open(closed: &AtomicBool) -> Result<()> {
    if closed.load(Ordering::Acquire) {
        return Err(ProxyError::Closed);
    }
    Ok(())
}
