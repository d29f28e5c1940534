mod connector;

pub use connector::{HyperConnector, HyperStream};
