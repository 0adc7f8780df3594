use query_core::CoreError;
use query_structure::DomainError;
use request_handlers::HandlerError;
use sql_query_builder::QueryBuilderError;
use thiserror::Error;
use user_facing_errors::{
    common::{InvalidConfiguration, SchemaParserError},
    KnownError,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{}", _0)]
    CoreError(CoreError),

    #[error("{}", _0)]
    HandlerError(HandlerError),

    #[error("Error in schema definition: {}", _0)]
    SchemaError(DomainError),

    #[error("{}", _0)]
    ConfigurationError(String),

    #[error("{}", _0)]
    JsonDecodeError(anyhow::Error),

    #[error("{}", _0)]
    IOError(anyhow::Error),

    #[error("{}", _0)]
    QueryBuilderError(QueryBuilderError),

    #[error("{}", _0)]
    InvocationError(String),
}

impl EngineError {
    pub fn render_as_json(self) -> Result<(), anyhow::Error> {
        use std::io::Write as _;

        let error: user_facing_errors::Error = match self {
            EngineError::CoreError(err) => err.into(),
            EngineError::HandlerError(err) => err.into(),
            EngineError::SchemaError(err) => KnownError::new(SchemaParserError {
                full_error: err.to_string(),
            })
            .into(),
            EngineError::ConfigurationError(details) => KnownError::new(InvalidConfiguration { details }).into(),
            other => user_facing_errors::Error::from_dyn_error(&other),
        };

        // One JSON document on a single line.
        let stderr = std::io::stderr();
        let mut writer = std::io::LineWriter::new(stderr.lock());
        serde_json::to_writer(&mut writer, &error)?;
        writeln!(&mut writer)?;
        writer.flush()?;

        Ok(())
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::ConfigurationError(message) => EngineError::ConfigurationError(message),
            e => EngineError::CoreError(e),
        }
    }
}

impl From<HandlerError> for EngineError {
    fn from(e: HandlerError) -> Self {
        EngineError::HandlerError(e)
    }
}

impl From<DomainError> for EngineError {
    fn from(e: DomainError) -> Self {
        EngineError::SchemaError(e)
    }
}

impl From<QueryBuilderError> for EngineError {
    fn from(e: QueryBuilderError) -> Self {
        EngineError::QueryBuilderError(e)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::JsonDecodeError(e.into())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::ConfigurationError(format!("Invalid configuration file: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::IOError(e.into())
    }
}

impl From<std::string::FromUtf8Error> for EngineError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        EngineError::IOError(e.into())
    }
}

impl From<base64::DecodeError> for EngineError {
    fn from(e: base64::DecodeError) -> Self {
        EngineError::ConfigurationError(format!("Invalid base64: {e}"))
    }
}

impl From<tracing_subscriber::util::TryInitError> for EngineError {
    fn from(e: tracing_subscriber::util::TryInitError) -> Self {
        EngineError::InvocationError(format!("Could not install the logger: {e}"))
    }
}
