//! An in-process backend keeping every table as a vector of rows. Serves as the reference
//! implementation of the connector interface and as the test backend of the engine.

mod connection;
mod connector;
mod counters;
mod error;
mod filter;
mod orderby;
mod store;

pub use connection::MemoryConnection;
pub use connector::MemoryConnector;
pub use counters::{CallCount, CallCounters};
pub use error::MemoryError;

type Result<T> = std::result::Result<T, MemoryError>;
