use crate::{query_translator, term::Term, CoreError, RequestContext};
use query_connector::RecordFilter;
use query_structure::{Collection, EntityKey, Filter, QueryArguments, RelationKind};
use std::collections::HashSet;

/// What a delete request targets. Exactly one form per request.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Keys(Vec<EntityKey>),
    Query(Vec<Term>),
    Hrefs(Vec<String>),
}

impl DeleteTarget {
    /// Picks the single target form that was supplied.
    pub fn exactly_one(
        keys: Option<Vec<EntityKey>>,
        query: Option<Vec<Term>>,
        hrefs: Option<Vec<String>>,
    ) -> crate::Result<Self> {
        match (keys, query, hrefs) {
            (Some(keys), None, None) => Ok(Self::Keys(keys)),
            (None, Some(query), None) => Ok(Self::Query(query)),
            (None, None, Some(hrefs)) => Ok(Self::Hrefs(hrefs)),
            (None, None, None) => Err(CoreError::client(
                "A delete needs entity keys, a query filter or a list of hrefs.",
            )),
            _ => Err(CoreError::client(
                "Entity keys, a query filter and a list of hrefs are mutually exclusive on delete.",
            )),
        }
    }
}

/// Deletes every entity the target resolves to. The rows are resolved through the regular read
/// path, a page at a time, so the same filter semantics as for reads apply.
pub async fn delete(ctx: &RequestContext<'_>, collection: &Collection, target: DeleteTarget) -> crate::Result<usize> {
    let filter = match target {
        DeleteTarget::Keys(keys) => keys_filter(collection, &keys)?,
        DeleteTarget::Hrefs(hrefs) => {
            let keys = hrefs
                .iter()
                .map(|href| collection.key_from_href(href))
                .collect::<query_structure::Result<Vec<_>>>()?;

            keys_filter(collection, &keys)?
        }
        DeleteTarget::Query(terms) => {
            let translated = query_translator::translate(&terms, collection, ctx.config)?;

            if translated.filter.is_empty() {
                return Err(CoreError::client("Refusing to delete without any filter condition."));
            }

            translated.filter
        }
    };

    let index = collection.primary_index();
    let page = ctx.config.delete_page_size;
    let mut resolved = HashSet::new();
    let mut deleted = 0;

    loop {
        let args = QueryArguments::new(collection.clone())
            .with_filter(filter.clone())
            .with_take(Some(page))
            .with_stable_order();

        let rows = ctx.conn.get_many_records(args).await?;

        if rows.is_empty() {
            break;
        }

        let mut selectors = Vec::with_capacity(rows.len());

        for row in &rows {
            let key = collection.key_of(row)?;

            if !resolved.insert(key.clone()) {
                return Err(CoreError::invariant(format!(
                    "`{key}` of `{}` resolved twice while deleting.",
                    collection.name()
                )));
            }

            selectors.push(
                row.select(index.columns())
                    .ok_or_else(|| CoreError::invariant("Row without primary key."))?,
            );
        }

        for relationship in collection.relationships() {
            if let RelationKind::ManyToMany { link } = relationship.kind() {
                let values = selectors.iter().filter_map(|s| index.values_of(s)).collect();
                ctx.conn
                    .delete_link_records(link, Filter::key_in(link.parent_columns.clone(), values))
                    .await?;
            }
        }

        deleted += ctx.conn.delete_records(collection, RecordFilter::from(selectors)).await?;

        if rows.len() < page {
            break;
        }
    }

    tracing::debug!(collection = collection.name(), deleted, "Deleted entities.");

    if deleted == 0 {
        return Err(CoreError::not_found(format!("Nothing of `{}` matched the delete.", collection.name())));
    }

    Ok(deleted)
}

fn keys_filter(collection: &Collection, keys: &[EntityKey]) -> crate::Result<Filter> {
    if keys.is_empty() {
        return Err(CoreError::client("A delete by key needs at least one key."));
    }

    let records = keys
        .iter()
        .map(|key| collection.decode_key(key))
        .collect::<query_structure::Result<Vec<_>>>()?;

    Ok(Filter::records_in(collection.primary_index(), &records))
}
