use crate::{Context, DbQuery, FilterBuilder, SqlFamily};
use query_structure::{Filter, LinkTable, QueryArguments, ResourceValue};

/// `SELECT` the rows of a collection matching the query arguments.
pub fn get_records(args: &QueryArguments, ctx: &Context) -> DbQuery {
    let mut builder = FilterBuilder::new(ctx);
    let distinct = if args.distinct { "DISTINCT " } else { "" };
    let mut sql = format!("SELECT {distinct}* FROM {}", ctx.quote(args.collection.db_name()));

    if let Some(condition) = builder.visit(&args.filter) {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }

    if !args.order_by.is_empty() {
        let orderings: Vec<String> = args
            .order_by
            .iter()
            .map(|o| format!("{} {}", ctx.quote(&o.column), o.sort_order.abbreviated()))
            .collect();

        sql.push_str(" ORDER BY ");
        sql.push_str(&orderings.join(", "));
    }

    push_window(&mut sql, &mut builder, args.take, args.skip);

    DbQuery {
        sql,
        params: builder.into_params(),
    }
}

/// `SELECT` rows of a many-to-many link table.
pub fn get_link_records(link: &LinkTable, filter: &Filter, take: Option<usize>, ctx: &Context) -> DbQuery {
    let mut builder = FilterBuilder::new(ctx);
    let columns: Vec<String> = link
        .parent_columns
        .iter()
        .chain(link.child_columns.iter())
        .map(|c| ctx.quote(c))
        .collect();

    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), ctx.quote(&link.table));

    if let Some(condition) = builder.visit(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }

    push_window(&mut sql, &mut builder, take, None);

    DbQuery {
        sql,
        params: builder.into_params(),
    }
}

fn push_window(sql: &mut String, builder: &mut FilterBuilder<'_>, take: Option<usize>, skip: Option<usize>) {
    let as_param = |n: usize| ResourceValue::Int(i64::try_from(n).unwrap_or(i64::MAX));

    match (take, skip) {
        (Some(take), _) => {
            let placeholder = builder.param(as_param(take));
            sql.push_str(&format!(" LIMIT {placeholder}"));
        }
        // Offsets without a limit need a limit in MySQL and SQLite.
        (None, Some(_)) => match builder.ctx().sql_family() {
            SqlFamily::Mysql => sql.push_str(" LIMIT 18446744073709551615"),
            SqlFamily::Sqlite => sql.push_str(" LIMIT -1"),
            SqlFamily::Postgres => (),
        },
        (None, None) => (),
    }

    if let Some(skip) = skip {
        let placeholder = builder.param(as_param(skip));
        sql.push_str(&format!(" OFFSET {placeholder}"));
    }
}
