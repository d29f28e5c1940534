use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;

use crate::domain::Result;

/// Answer of an override hook: available now, or once a future completes.
///
/// `Ok(None)` and `Ok(Some(""))` both mean "no proxy".
pub enum ProxyLookup {
    Ready(Result<Option<String>>),
    Pending(BoxFuture<'static, Result<Option<String>>>),
}

impl ProxyLookup {
    pub async fn resolve(self) -> Result<Option<String>> {
        match self {
            ProxyLookup::Ready(answer) => answer,
            ProxyLookup::Pending(future) => future.await,
        }
    }
}

/// Port for an authoritative proxy override, consulted before any other rule
pub trait ProxyForUrl: Send + Sync {
    /// `url` is the full target URL string
    fn proxy_for_url(&self, url: &str) -> ProxyLookup;
}

/// Hook answering synchronously from a closure
pub struct SyncProxyHook<F>(pub F);

impl<F> ProxyForUrl for SyncProxyHook<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn proxy_for_url(&self, url: &str) -> ProxyLookup {
        ProxyLookup::Ready(Ok((self.0)(url)))
    }
}

/// Hook answering from a future-returning closure
pub struct AsyncProxyHook<F>(pub F);

impl<F, Fut> ProxyForUrl for AsyncProxyHook<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Option<String>> + Send + 'static,
{
    fn proxy_for_url(&self, url: &str) -> ProxyLookup {
        ProxyLookup::Pending((self.0)(url.to_string()).map(Ok).boxed())
    }
}
