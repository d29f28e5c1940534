pub mod adapters;
pub mod connection;
pub mod domain;
pub mod ports;

pub use adapters::default_dispatcher;
pub use connection::ProxyConnection;
pub use domain::{ProxyConfig, ProxyDispatcher, ProxyError, Result, TargetRequest};
