pub mod connectors;
pub mod env;
pub mod hyper_client;
pub mod pac_resolver;
pub mod tracking;

pub use connectors::*;
pub use env::{MapEnv, ProcessEnv};
pub use hyper_client::{HyperConnector, HyperStream};
pub use pac_resolver::*;
pub use tracking::*;

use std::sync::Arc;

use crate::domain::{ProxyConfig, ProxyDispatcher, ProxyUrlResolver, Result};

/// Dispatcher wired with the stock adapters: process environment, the
/// default connectors and an in-memory connection tracker.
pub fn default_dispatcher(config: ProxyConfig) -> Result<ProxyDispatcher> {
    let factory = DefaultConnectorFactory::new()?;
    let direct = Arc::new(factory.direct(config.connector.clone()));
    let resolver = ProxyUrlResolver::new(config, Arc::new(ProcessEnv));
    Ok(ProxyDispatcher::new(
        resolver,
        Arc::new(factory),
        direct,
        Arc::new(ConnectionTracker::new()),
    ))
}
