pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod no_proxy;
pub mod resolver;
pub mod selector;
pub mod service;

pub use cache::AgentCache;
pub use config::{ConnectorOptions, DispatchSettings, ProxyConfig, ProxyOption};
pub use errors::*;
pub use models::*;
pub use no_proxy::{is_excluded, NoProxy};
pub use resolver::ProxyUrlResolver;
pub use selector::{classify, ProxyScheme, TransportKind};
pub use service::ProxyDispatcher;
