use super::{flatten, WriteMode};
use crate::{
    document::{self, Document},
    CoreError, RequestContext,
};
use query_connector::RecordFilter;
use query_structure::{Collection, EntityKey, Filter, QueryArguments, Record};

/// Updates only the attributes present in each document. Nothing is written recursively:
/// to-many relationships and nested content are rejected.
pub async fn patch(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    documents: &[Document],
) -> crate::Result<Vec<EntityKey>> {
    let mut keys = Vec::with_capacity(documents.len());

    for document in documents {
        let href = document::href_of(document)
            .ok_or_else(|| CoreError::client("Every patched document needs an href."))?;

        let key = collection.key_from_href(href)?;
        let selector = collection.decode_key(&key)?;
        let mut values = flatten(collection, document, WriteMode::Patch)?;

        for column in collection.primary_index().columns() {
            values.remove(column);
        }

        let found = if values.is_empty() {
            exists(ctx, collection, &selector).await?
        } else {
            let updated = ctx
                .conn
                .update_records(collection, RecordFilter::from(vec![selector]), values)
                .await?;

            updated > 0
        };

        if !found {
            return Err(CoreError::not_found(format!("No `{}` with key `{key}`.", collection.name())));
        }

        keys.push(key);
    }

    tracing::debug!(collection = collection.name(), patched = keys.len(), "Patched documents.");

    Ok(keys)
}

async fn exists(ctx: &RequestContext<'_>, collection: &Collection, selector: &Record) -> crate::Result<bool> {
    let args = QueryArguments::new(collection.clone())
        .with_filter(Filter::records_in(collection.primary_index(), std::slice::from_ref(selector)))
        .with_take(Some(1));

    Ok(!ctx.conn.get_many_records(args).await?.is_empty())
}
