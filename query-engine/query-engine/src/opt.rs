use crate::{error::EngineError, EngineResult, LogFormat};
use query_core::EngineConfig;
use query_structure::{InternalSchema, InternalSchemaRef};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "query-engine", about = "Serves a hypermedia resource graph over an in-memory store.")]
pub struct EngineOpt {
    /// Path to the engine configuration file (TOML, `[engine]` table).
    #[structopt(long, short = "c", parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Path to the schema definition (JSON).
    #[structopt(long, short = "s", parse(from_os_str))]
    pub schema: Option<PathBuf>,

    /// Base64 encoded schema definition, used instead of `--schema`.
    #[structopt(long)]
    pub schema_base64: Option<String>,

    /// Seed documents (JSON object of collection path to an array of documents).
    #[structopt(long, parse(from_os_str))]
    pub seed: Option<PathBuf>,

    /// Log output format, `text` or `json`.
    #[structopt(long, default_value = "text")]
    pub log_format: LogFormat,

    #[structopt(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Executes one request and prints the response as JSON.
    Execute(ExecuteInput),
    /// Prints the SQL statement a listing request translates into.
    Explain(ExplainInput),
}

#[derive(Debug, StructOpt)]
pub struct ExecuteInput {
    /// HTTP method: GET, POST, PUT, PATCH or DELETE.
    pub method: String,

    /// Request target below the base URL, e.g. `/owners?expands=pets`.
    pub target: String,

    /// JSON request body.
    #[structopt(long)]
    pub body: Option<String>,

    /// The principal the request runs as.
    #[structopt(long)]
    pub principal: Option<String>,
}

#[derive(Debug, StructOpt)]
pub struct ExplainInput {
    /// Listing target, e.g. `/pets?name=R*&sort=-name`.
    pub target: String,

    /// SQL dialect: postgres, mysql or sqlite.
    #[structopt(long, default_value = "postgres")]
    pub family: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineOpt {
    pub fn engine_config(&self) -> EngineResult<EngineConfig> {
        let config = match &self.config {
            Some(path) => toml::from_str::<ConfigFile>(&fs::read_to_string(path)?)?.engine,
            None => EngineConfig::default(),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn schema(&self) -> EngineResult<InternalSchemaRef> {
        let json = match (&self.schema, &self.schema_base64) {
            (Some(path), None) => fs::read_to_string(path)?,
            (None, Some(encoded)) => {
                use base64::Engine as _;

                let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
                String::from_utf8(bytes)?
            }
            (Some(_), Some(_)) => {
                return Err(EngineError::ConfigurationError(
                    "Pass either --schema or --schema-base64, not both.".to_owned(),
                ))
            }
            (None, None) => {
                return Err(EngineError::ConfigurationError(
                    "A schema definition is required (--schema or --schema-base64).".to_owned(),
                ))
            }
        };

        Ok(InternalSchema::from_json(&json)?)
    }
}
