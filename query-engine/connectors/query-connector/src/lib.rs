#![deny(unsafe_code)]

pub mod error;

mod interface;

pub use interface::*;

pub type Result<T> = std::result::Result<T, error::ConnectorError>;
