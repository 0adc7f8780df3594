mod context;
mod filter;
pub mod read;
pub mod write;

use query_structure::{Collection, Filter, LinkTable, QueryArguments, Record, ResourceValue};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub use context::{Context, PlaceholderFormat, SqlFamily};
pub use filter::FilterBuilder;

const PARAMETER_LIMIT: usize = 2000;

/// A rendered statement: SQL text with placeholders, and the values bound to them in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbQuery {
    pub sql: String,
    pub params: Vec<ResourceValue>,
}

impl fmt::Display for DbQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params.iter().map(|p| format!("{p:?}")).collect::<Vec<_>>();
        write!(f, "{}\n-- params: [{}]", self.sql, params.join(", "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryBuilderError {
    #[error("The statement binds {actual} parameters, more than the limit of {limit}.")]
    ParameterLimitExceeded { actual: usize, limit: usize },

    #[error("Nothing to write into `{table}`.")]
    EmptyWrite { table: String },
}

pub type Result<T> = std::result::Result<T, QueryBuilderError>;

/// Renders backend-neutral read and write operations into parameterised SQL.
pub struct SqlQueryBuilder {
    context: Context,
}

impl SqlQueryBuilder {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn build_get_records(&self, query_arguments: &QueryArguments) -> Result<DbQuery> {
        self.finish(read::get_records(query_arguments, &self.context))
    }

    pub fn build_get_link_records(&self, link: &LinkTable, filter: &Filter, take: Option<usize>) -> Result<DbQuery> {
        self.finish(read::get_link_records(link, filter, take, &self.context))
    }

    pub fn build_insert(&self, table: &str, records: &[Record]) -> Result<DbQuery> {
        self.finish(write::insert_records(table, records, &self.context)?)
    }

    pub fn build_update(&self, collection: &Collection, filter: &Filter, values: &Record) -> Result<DbQuery> {
        self.finish(write::update_records(collection.db_name(), filter, values, &self.context)?)
    }

    pub fn build_delete(&self, table: &str, filter: &Filter) -> Result<DbQuery> {
        self.finish(write::delete_records(table, filter, &self.context))
    }

    fn finish(&self, query: DbQuery) -> Result<DbQuery> {
        if query.params.len() > PARAMETER_LIMIT {
            return Err(QueryBuilderError::ParameterLimitExceeded {
                actual: query.params.len(),
                limit: PARAMETER_LIMIT,
            });
        }

        Ok(query)
    }
}
