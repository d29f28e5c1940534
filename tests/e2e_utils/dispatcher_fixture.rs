#![cfg(test)]
#![allow(dead_code)]

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::HOST;
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use url::Url;

use proxy_dispatch::adapters::{ConnectionTracker, DefaultConnectorFactory, HyperConnector, MapEnv};
use proxy_dispatch::domain::{ConnectorOptions, ProxyConfig, ProxyDispatcher, ProxyUrlResolver};

/// Dispatcher over the stock connectors, reading proxy variables from `env`.
pub fn dispatcher(env: &[(&str, &str)]) -> Arc<ProxyDispatcher> {
    dispatcher_with(ProxyConfig::new(), env)
}

pub fn dispatcher_with(config: ProxyConfig, env: &[(&str, &str)]) -> Arc<ProxyDispatcher> {
    let factory = DefaultConnectorFactory::new().expect("TLS configuration");
    let direct = Arc::new(factory.direct(ConnectorOptions::default()));
    let resolver = ProxyUrlResolver::new(config, Arc::new(MapEnv::from_pairs(env)));
    Arc::new(ProxyDispatcher::new(
        resolver,
        Arc::new(factory),
        direct,
        Arc::new(ConnectionTracker::new()),
    ))
}

pub async fn fetch(dispatcher: &Arc<ProxyDispatcher>, url: &str) -> String {
    fetch_with_host(dispatcher, url, None).await
}

/// GET through hyper's client; `host` overrides the Host header.
pub async fn fetch_with_host(dispatcher: &Arc<ProxyDispatcher>, url: &str, host: Option<&str>) -> String {
    let client: Client<HyperConnector, Empty<Bytes>> =
        Client::builder(TokioExecutor::new()).build(HyperConnector::new(dispatcher.clone()));

    let mut request = Request::get(url);
    if let Some(host) = host {
        request = request.header(HOST, host);
    }
    let response = client
        .request(request.body(Empty::new()).unwrap())
        .await
        .expect("request should succeed");
    assert!(response.status().is_success(), "unexpected status {}", response.status());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

/// PAC script on disk, returned as a `file://` URL.
pub fn write_pac_script(body: &str) -> (std::path::PathBuf, Url) {
    let path = std::env::temp_dir().join(format!("proxy-dispatch-e2e-{}.pac", uuid::Uuid::new_v4()));
    std::fs::write(&path, body).expect("PAC script should be writable");
    let url = Url::from_file_path(&path).expect("absolute temp path");
    (path, url)
}
