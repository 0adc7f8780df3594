pub mod cli;
pub mod error;
pub mod logger;
pub mod opt;
pub mod seed;

use error::EngineError;
use std::str::FromStr;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Copy)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(EngineError::ConfigurationError(format!(
                "Unknown log format `{other}`, expected `text` or `json`."
            ))),
        }
    }
}
