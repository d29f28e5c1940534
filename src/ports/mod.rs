pub mod connector;
pub mod env;
pub mod proxy_hook;
pub mod tracking;

pub use connector::{BoxedIo, Connector, ConnectorFactory, ProxyIo};
pub use env::EnvSource;
pub use proxy_hook::{AsyncProxyHook, ProxyForUrl, ProxyLookup, SyncProxyHook};
pub use tracking::TrackingPort;
