#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod dispatcher_fixture;
pub mod intermediate_proxy;
pub mod target_server;

pub use dispatcher_fixture::{dispatcher, dispatcher_with, fetch, fetch_with_host, write_pac_script};
pub use intermediate_proxy::IntermediateProxy;
pub use target_server::TargetServer;
