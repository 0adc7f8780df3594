use crate::{
    document::{self, Document},
    expansion, CoreError, Projection, RequestContext, TranslatedQuery,
};
use indexmap::{IndexMap, IndexSet};
use query_structure::{Collection, EntityKey, Filter, QueryArguments, Relationship};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    pub page_num: usize,
    pub page_size: usize,
    pub has_next: bool,
}

/// Lists a page of `collection` matching the translated query, expanded and projected.
pub async fn find_page(ctx: &RequestContext<'_>, collection: &Collection, query: &TranslatedQuery) -> crate::Result<Page> {
    let args = query.page_arguments(collection);
    read_page(ctx, collection, args, query).await
}

/// Fetches entities by key, in the order the keys were given. Keys without a row are skipped,
/// but at least one must resolve.
pub async fn find_by_keys(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    keys: &[EntityKey],
    query: &TranslatedQuery,
) -> crate::Result<Vec<Document>> {
    // Repeated keys name the same entity once.
    let keys: IndexSet<&EntityKey> = keys.iter().collect();

    let records = keys
        .iter()
        .map(|key| collection.decode_key(key))
        .collect::<query_structure::Result<Vec<_>>>()?;

    let args = QueryArguments::new(collection.clone())
        .with_filter(Filter::records_in(collection.primary_index(), &records).and_also(query.filter.clone()));

    let mut found: IndexMap<EntityKey, Document> = IndexMap::new();

    for row in ctx.conn.get_many_records(args).await? {
        let (key, document) = document::shape_record(collection, row, ctx.base_url())?;
        found.insert(key, document);
    }

    let documents: Vec<Document> = keys.iter().filter_map(|key| found.get(*key).cloned()).collect();

    if documents.is_empty() {
        let keys: Vec<&str> = keys.iter().map(|key| key.as_str()).collect();

        return Err(CoreError::not_found(format!(
            "No `{}` with key(s) `{}`.",
            collection.name(),
            keys.join(",")
        )));
    }

    finish(ctx, collection, documents, query).await
}

/// Lists the members of `relationship` for the entity `key`. The query is evaluated against the
/// related collection.
pub async fn find_related(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    key: &EntityKey,
    query: &TranslatedQuery,
) -> crate::Result<Page> {
    let collection = relationship.collection();
    let related = relationship.related();
    let parent = collection.decode_key(key)?;

    let exists = QueryArguments::new(collection.clone())
        .with_filter(Filter::records_in(collection.primary_index(), std::slice::from_ref(&parent)))
        .with_take(Some(1));

    if ctx.conn.get_many_records(exists).await?.is_empty() {
        return Err(CoreError::not_found(format!("No `{}` with key `{key}`.", collection.name())));
    }

    let children: Vec<_> = ctx
        .conn
        .get_related_record_ids(relationship, &[parent])
        .await?
        .into_iter()
        .map(|(_, child)| child)
        .collect();

    let mut args = query.page_arguments(&related);
    args.filter = Filter::records_in(related.primary_index(), &children).and_also(args.filter);

    read_page(ctx, &related, args, query).await
}

async fn read_page(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    args: QueryArguments,
    query: &TranslatedQuery,
) -> crate::Result<Page> {
    let mut rows = ctx.conn.get_many_records(args).await?;
    let has_next = rows.len() > query.limit;
    rows.truncate(query.limit);

    let documents = rows
        .into_iter()
        .map(|row| document::shape_record(collection, row, ctx.base_url()).map(|(_, document)| document))
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(Page {
        documents: finish(ctx, collection, documents, query).await?,
        page_num: query.page_num,
        page_size: query.limit,
        has_next,
    })
}

/// Expands and projects shaped documents for output.
pub async fn finish(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    documents: Vec<Document>,
    query: &TranslatedQuery,
) -> crate::Result<Vec<Document>> {
    let mut documents = expansion::expand(ctx, collection, documents, &query.expands).await?;
    let projection = Projection::new(&query.includes, &query.excludes);

    for document in documents.iter_mut() {
        projection.apply(document);
    }

    Ok(documents)
}
