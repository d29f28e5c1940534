use super::pac_evaluator::evaluate_pac;
use crate::domain::{ProxyError, Result};
use crate::ports::{ProxyForUrl, ProxyLookup};
use futures::FutureExt;
use log::debug;
use lru::LruCache;
use reqwest::ClientBuilder;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

const PAC_CACHE_SIZE: usize = 5;

/// Override hook answering from a PAC script
///
/// The script is fetched once (`http(s)://` or `file://`) and evaluated on a
/// blocking worker for every lookup.
#[derive(Clone)]
pub struct PacProxyResolver {
    pac_url: Url,
    pac_cache: Arc<RwLock<LruCache<String, Arc<str>>>>,
    client: reqwest::Client,
}

impl PacProxyResolver {
    pub fn new(pac_url: &str) -> Result<Self> {
        let pac_url: Url = pac_url
            .parse()
            .map_err(|e| ProxyError::Configuration(format!("Invalid PAC URL {:?}: {}", pac_url, e)))?;

        // The PAC file itself is always fetched directly.
        let client = ClientBuilder::new()
            .no_proxy()
            .build()
            .map_err(|e| ProxyError::ResolutionFailed(format!("HTTP client error: {}", e)))?;

        let size = NonZeroUsize::new(PAC_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            pac_url,
            pac_cache: Arc::new(RwLock::new(LruCache::new(size))),
            client,
        })
    }

    pub fn pac_url(&self) -> &Url {
        &self.pac_url
    }

    /// Forget the downloaded script; the next lookup fetches it again
    pub async fn invalidate(&self) {
        self.pac_cache.write().await.clear();
    }

    async fn load_pac(&self) -> Result<Arc<str>> {
        debug!("Attempting to download PAC file at {}", self.pac_url);

        let pac_file = if self.pac_url.scheme() == "file" {
            let path = self
                .pac_url
                .to_file_path()
                .map_err(|_| ProxyError::Configuration(format!("Invalid PAC path: {}", self.pac_url)))?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ProxyError::ResolutionFailed(format!("PAC read error: {}", e)))?
        } else {
            self.client
                .get(self.pac_url.as_str())
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|e| ProxyError::ResolutionFailed(format!("PAC download error: {}", e)))?
                .text()
                .await
                .map_err(|e| ProxyError::ResolutionFailed(format!("PAC read error: {}", e)))?
        };

        let pac_file: Arc<str> = pac_file.into();
        let mut cache = self.pac_cache.write().await;
        cache.put(self.pac_url.to_string(), pac_file.clone());

        info!("Loaded PAC file from {} ({} bytes)", self.pac_url, pac_file.len());
        Ok(pac_file)
    }

    async fn get_pac_file(&self) -> Result<Arc<str>> {
        {
            let mut cache = self.pac_cache.write().await;
            if let Some(cached) = cache.get(self.pac_url.as_str()) {
                return Ok(cached.clone());
            }
        }

        self.load_pac().await
    }

    /// Proxy URL the PAC script picks for `target`, `None` for direct
    pub async fn find_proxy(&self, target: &str) -> Result<Option<String>> {
        let target: Url = target
            .parse()
            .map_err(|e| ProxyError::InvalidUri(format!("{}: {}", target, e)))?;
        let pac_file = self.get_pac_file().await?;

        // The JS runtime blocks and is not Send, so it lives on its own thread.
        let proxy = tokio::task::spawn_blocking(move || evaluate_pac(&pac_file, &target))
            .await
            .map_err(|e| ProxyError::ResolutionFailed(format!("PAC evaluation aborted: {}", e)))??;
        debug!("PAC answered {:?}", proxy);
        Ok(proxy)
    }
}

impl ProxyForUrl for PacProxyResolver {
    fn proxy_for_url(&self, url: &str) -> ProxyLookup {
        let resolver = self.clone();
        let url = url.to_string();
        ProxyLookup::Pending(async move { resolver.find_proxy(&url).await }.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pac_file(body: &str) -> (std::path::PathBuf, Url) {
        let path = std::env::temp_dir().join(format!("proxy-dispatch-{}.pac", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        let url = Url::from_file_path(&path).unwrap();
        (path, url)
    }

    #[tokio::test]
    async fn test_pac_hook_answers_from_file() {
        let (path, url) = pac_file(
            r#"function FindProxyForURL(url, host) {
                return host == "example.local" ? "DIRECT" : "PROXY 127.0.0.1:3128";
            }"#,
        );
        let resolver = PacProxyResolver::new(url.as_str()).unwrap();

        let direct = resolver.proxy_for_url("http://example.local/test").resolve().await.unwrap();
        let proxied = resolver.proxy_for_url("https://example.com/").resolve().await.unwrap();

        assert_eq!(direct, None);
        assert_eq!(proxied.as_deref(), Some("http://127.0.0.1:3128"));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_pac_script_is_cached_until_invalidated() {
        let (path, url) = pac_file(r#"function FindProxyForURL(url, host) { return "PROXY a:1"; }"#);
        let resolver = PacProxyResolver::new(url.as_str()).unwrap();

        assert_eq!(resolver.find_proxy("http://x.com/").await.unwrap().as_deref(), Some("http://a:1"));

        std::fs::write(&path, r#"function FindProxyForURL(url, host) { return "PROXY b:2"; }"#).unwrap();
        assert_eq!(resolver.find_proxy("http://x.com/").await.unwrap().as_deref(), Some("http://a:1"));

        resolver.invalidate().await;
        assert_eq!(resolver.find_proxy("http://x.com/").await.unwrap().as_deref(), Some("http://b:2"));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_pac_file_fails_resolution() {
        let resolver = PacProxyResolver::new("file:///nonexistent/proxy.pac").unwrap();

        let err = resolver.find_proxy("http://x.com/").await.unwrap_err();
        assert!(matches!(err, ProxyError::ResolutionFailed(_)));
    }
}
