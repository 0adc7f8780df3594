use crate::{Context, DbQuery, FilterBuilder, QueryBuilderError};
use itertools::Itertools;
use query_structure::{Filter, Record, ResourceValue};

/// `INSERT` rows into a table. Columns are the union of all records' columns, missing values are
/// bound as null.
pub fn insert_records(table: &str, records: &[Record], ctx: &Context) -> crate::Result<DbQuery> {
    let columns: Vec<&str> = records.iter().flat_map(|r| r.columns()).unique().collect();

    if columns.is_empty() {
        return Err(QueryBuilderError::EmptyWrite { table: table.to_owned() });
    }

    let mut builder = FilterBuilder::new(ctx);
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            let values: Vec<String> = columns
                .iter()
                .map(|c| builder.param(record.get(c).cloned().unwrap_or(ResourceValue::Null)))
                .collect();

            format!("({})", values.join(", "))
        })
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        ctx.quote(table),
        columns.iter().map(|c| ctx.quote(c)).join(", "),
        rows.join(", ")
    );

    Ok(DbQuery {
        sql,
        params: builder.into_params(),
    })
}

/// `UPDATE` every row matching the filter with the given column values.
pub fn update_records(table: &str, filter: &Filter, values: &Record, ctx: &Context) -> crate::Result<DbQuery> {
    if values.is_empty() {
        return Err(QueryBuilderError::EmptyWrite { table: table.to_owned() });
    }

    let mut builder = FilterBuilder::new(ctx);
    let assignments: Vec<String> = values
        .iter()
        .map(|(column, value)| format!("{} = {}", ctx.quote(column), builder.param(value.clone())))
        .collect();

    let mut sql = format!("UPDATE {} SET {}", ctx.quote(table), assignments.join(", "));

    if let Some(condition) = builder.visit(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }

    Ok(DbQuery {
        sql,
        params: builder.into_params(),
    })
}

/// `DELETE` every row matching the filter.
pub fn delete_records(table: &str, filter: &Filter, ctx: &Context) -> DbQuery {
    let mut builder = FilterBuilder::new(ctx);
    let mut sql = format!("DELETE FROM {}", ctx.quote(table));

    if let Some(condition) = builder.visit(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }

    DbQuery {
        sql,
        params: builder.into_params(),
    }
}
