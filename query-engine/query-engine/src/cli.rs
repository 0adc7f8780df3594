use crate::{
    error::EngineError,
    opt::{EngineOpt, Subcommand},
    seed, EngineResult,
};
use memory_query_connector::MemoryConnector;
use query_core::{term, translate, CoreError, EngineConfig};
use query_structure::InternalSchemaRef;
use request_handlers::{Method, RequestHandler, RestRequest, RestResponse};
use serde_json::{json, Map, Value};
use sql_query_builder::{Context, SqlFamily, SqlQueryBuilder};
use std::fs;

pub struct ExecuteRequest {
    method: Method,
    target: String,
    body: Option<Value>,
    principal: Option<String>,
}

pub struct ExplainRequest {
    target: String,
    family: SqlFamily,
}

pub enum CliCommand {
    Execute(ExecuteRequest),
    Explain(ExplainRequest),
}

/// Everything a command runs against: settings, schema and a seeded store.
pub struct EngineContext {
    config: EngineConfig,
    schema: InternalSchemaRef,
    connector: MemoryConnector,
}

impl EngineContext {
    pub fn new(config: EngineConfig, schema: InternalSchemaRef) -> Self {
        Self {
            config,
            schema,
            connector: MemoryConnector::new(),
        }
    }

    pub async fn load(opts: &EngineOpt) -> EngineResult<Self> {
        let context = Self::new(opts.engine_config()?, opts.schema()?);

        if let Some(path) = &opts.seed {
            let documents: Map<String, Value> = serde_json::from_str(&fs::read_to_string(path)?)?;
            context.seed(documents).await?;
        }

        Ok(context)
    }

    pub async fn seed(&self, documents: Map<String, Value>) -> EngineResult<usize> {
        seed::seed(&self.handler(), documents).await
    }

    pub fn handler(&self) -> RequestHandler<'_> {
        RequestHandler::new(&self.connector, &self.schema, &self.config)
    }
}

impl CliCommand {
    pub fn from_opt(opts: &EngineOpt) -> EngineResult<Self> {
        match &opts.subcommand {
            Subcommand::Execute(input) => Ok(CliCommand::Execute(ExecuteRequest {
                method: input.method.parse()?,
                target: input.target.clone(),
                body: input.body.as_deref().map(serde_json::from_str).transpose()?,
                principal: input.principal.clone(),
            })),
            Subcommand::Explain(input) => Ok(CliCommand::Explain(ExplainRequest {
                target: input.target.clone(),
                family: parse_family(&input.family)?,
            })),
        }
    }

    /// Runs the command and returns what should be printed.
    pub async fn execute(self, context: &EngineContext) -> EngineResult<String> {
        match self {
            CliCommand::Execute(request) => Self::execute_request(request, context).await,
            CliCommand::Explain(request) => Self::explain(request, context),
        }
    }

    async fn execute_request(request: ExecuteRequest, context: &EngineContext) -> EngineResult<String> {
        let mut rest_request = RestRequest::new(request.method, &request.target);
        rest_request.body = request.body;
        rest_request.principal = request.principal;

        let response = context.handler().handle(rest_request).await;

        Ok(serde_json::to_string_pretty(&render_response(response))?)
    }

    fn explain(request: ExplainRequest, context: &EngineContext) -> EngineResult<String> {
        let rest_request = RestRequest::get(&request.target);
        let path = rest_request.path.trim_matches('/');

        if path.is_empty() || path.contains('/') {
            return Err(EngineError::InvocationError(format!(
                "Only collection listings can be explained, got `{}`.",
                rest_request.path
            )));
        }

        let collection = context
            .schema
            .find_collection_by_path(path)
            .map_err(CoreError::from)?;

        let params = rest_request
            .query
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));

        let terms = term::parse_query(params, &context.config)?;
        let query = translate(&terms, &collection, &context.config)?;
        let args = query.page_arguments(&collection);

        let statement = SqlQueryBuilder::new(Context::new(request.family)).build_get_records(&args)?;

        Ok(statement.to_string())
    }
}

fn parse_family(family: &str) -> EngineResult<SqlFamily> {
    match family.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(SqlFamily::Postgres),
        "mysql" => Ok(SqlFamily::Mysql),
        "sqlite" => Ok(SqlFamily::Sqlite),
        other => Err(EngineError::InvocationError(format!("Unknown SQL family `{other}`."))),
    }
}

fn render_response(response: RestResponse) -> Value {
    let headers: Map<String, Value> = response
        .headers
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();

    json!({
        "status": response.status,
        "headers": headers,
        "body": response.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use query_structure::InternalSchema;

    const SCHEMA: &str = indoc! {r#"
        {
          "collections": [
            {
              "name": "authors",
              "properties": [
                { "name": "id", "type": "number", "nullable": false },
                { "name": "name", "type": "string" }
              ],
              "primary_index": ["id"],
              "relationships": [
                { "name": "books", "kind": "one_to_many", "related": "books", "foreign_key": "books_author", "inverse": "author" }
              ]
            },
            {
              "name": "books",
              "properties": [
                { "name": "id", "type": "number", "nullable": false },
                { "name": "title", "type": "string" },
                { "name": "authorId", "column": "author_id", "type": "number" }
              ],
              "primary_index": ["id"],
              "indexes": [{ "name": "books_author", "properties": ["authorId"] }],
              "relationships": [
                { "name": "author", "kind": "many_to_one", "related": "authors", "foreign_key": "books_author", "inverse": "books" }
              ]
            }
          ]
        }
    "#};

    async fn library() -> EngineContext {
        let context = EngineContext::new(EngineConfig::default(), InternalSchema::from_json(SCHEMA).unwrap());

        let seed = json!({
            "authors": [
                { "id": 1, "name": "Le Guin", "books": [{ "title": "The Dispossessed" }] },
                { "id": 2, "name": "Lem" }
            ]
        });

        let written = context.seed(seed.as_object().cloned().unwrap()).await.unwrap();
        assert_eq!(written, 2);

        context
    }

    #[tokio::test]
    async fn execute_prints_status_headers_and_body() {
        let context = library().await;

        let command = CliCommand::Execute(ExecuteRequest {
            method: Method::Get,
            target: "/books?expands=author&includes=title,author.name".to_owned(),
            body: None,
            principal: None,
        });

        let output: Value = serde_json::from_str(&command.execute(&context).await.unwrap()).unwrap();

        assert_eq!(output["status"], json!(200));
        assert_eq!(output["body"]["data"][0]["title"], json!("The Dispossessed"));
        assert_eq!(output["body"]["data"][0]["author"]["name"], json!("Le Guin"));
        assert_eq!(output["body"]["meta"], json!({ "pageNum": 1, "pageSize": 100 }));
    }

    #[tokio::test]
    async fn execute_reports_locations_of_created_entities() {
        let context = library().await;

        let command = CliCommand::Execute(ExecuteRequest {
            method: Method::Post,
            target: "/authors".to_owned(),
            body: Some(json!({ "name": "Banks" })),
            principal: None,
        });

        let output: Value = serde_json::from_str(&command.execute(&context).await.unwrap()).unwrap();

        assert_eq!(output["status"], json!(201));
        assert_eq!(output["headers"]["Location"], json!("http://localhost/authors/3"));
    }

    #[tokio::test]
    async fn explain_renders_the_listing_statement() {
        let context = library().await;

        let command = CliCommand::Explain(ExplainRequest {
            target: "/books?title=The*&sort=-title".to_owned(),
            family: SqlFamily::Postgres,
        });

        let sql = command.execute(&context).await.unwrap();

        assert!(sql.starts_with(r#"SELECT * FROM "books" WHERE "title" LIKE $1"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "title" DESC"#), "{sql}");

        let nested = CliCommand::Explain(ExplainRequest {
            target: "/authors/1/books".to_owned(),
            family: SqlFamily::Postgres,
        });

        assert!(nested.execute(&context).await.is_err());
    }

    #[test]
    fn families_parse_by_name() {
        assert_eq!(parse_family("PostgreSQL").unwrap(), SqlFamily::Postgres);
        assert_eq!(parse_family("sqlite").unwrap(), SqlFamily::Sqlite);
        assert!(parse_family("oracle").is_err());
    }
}
