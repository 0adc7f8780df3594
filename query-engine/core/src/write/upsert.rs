use super::{
    flatten, foreign_key_values,
    reconcile::{self, Membership},
    reference_key, WriteMode,
};
use crate::{
    document::{self, Document, HREF},
    CoreError, NestedWrite, RequestContext,
};
use query_structure::{Collection, EntityKey, RelationKind, Record, Relationship};
use serde_json::{json, Value};

/// Creates or updates a batch of documents of `collection`, including nested children.
///
/// 1. The scalar part of every document is written in one batched upsert.
/// 2. Content-bearing children are submitted per relationship through the front door.
/// 3. Foreign keys of parents pointing at freshly written many-to-one children are backfilled.
/// 4. The desired membership of every submitted to-many relationship is collected.
/// 5. Relationships are reconciled: missing pairs are written, stale ones removed.
///
/// On return every document carries its `href`, as do all nested children.
pub async fn upsert(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    documents: &mut [Document],
) -> crate::Result<Vec<EntityKey>> {
    if documents.is_empty() {
        return Ok(vec![]);
    }

    tracing::debug!(
        collection = collection.name(),
        documents = documents.len(),
        nested = ctx.is_nested(),
        "Upserting documents."
    );

    let records = documents
        .iter()
        .map(|document| flatten(collection, document, WriteMode::Upsert))
        .collect::<crate::Result<Vec<_>>>()?;

    let stored = ctx.conn.upsert_records(collection, records).await?;

    if stored.len() != documents.len() {
        return Err(CoreError::invariant(format!(
            "Upserted {} documents of `{}` but the backend returned {} rows.",
            documents.len(),
            collection.name(),
            stored.len()
        )));
    }

    let mut keys = Vec::with_capacity(stored.len());

    for (document, row) in documents.iter_mut().zip(&stored) {
        let key = collection.key_of(row)?;
        document.insert(HREF.to_owned(), Value::String(collection.href(ctx.base_url(), &key)));
        keys.push(key);
    }

    let mut backfill: Vec<(usize, Relationship)> = Vec::new();

    for relationship in collection.relationships() {
        match relationship.kind() {
            RelationKind::ManyToOne { .. } => {
                let written = write_parent_references(ctx, &relationship, documents).await?;
                backfill.extend(written.into_iter().map(|idx| (idx, relationship.clone())));
            }
            _ => write_children(ctx, &relationship, documents, &stored).await?,
        }
    }

    if !backfill.is_empty() {
        backfill_foreign_keys(ctx, collection, documents, &stored, backfill).await?;
    }

    for relationship in collection.relationships().into_iter().filter(|r| r.is_to_many()) {
        let memberships = desired_memberships(&relationship, documents, &stored)?;

        if !memberships.is_empty() {
            reconcile::reconcile(ctx, &relationship, &memberships).await?;
        }
    }

    Ok(keys)
}

/// Submits the many-to-one children that carry content. Returns the positions of the parents
/// whose reference had no href before, so their foreign keys still need to be written.
async fn write_parent_references(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    documents: &mut [Document],
) -> crate::Result<Vec<usize>> {
    let mut positions = Vec::new();
    let mut children = Vec::new();

    for (idx, document) in documents.iter().enumerate() {
        if let Some(Value::Object(child)) = document.get(relationship.name()) {
            if !document::is_link_only_object(child) {
                positions.push((idx, !child.contains_key(HREF)));
                children.push(child.clone());
            }
        }
    }

    if children.is_empty() {
        return Ok(vec![]);
    }

    let written = submit(ctx, relationship, children).await?;

    let mut unlinked = Vec::new();

    for ((idx, needs_backfill), child) in positions.into_iter().zip(written) {
        documents[idx].insert(relationship.name().to_owned(), Value::Object(child));

        if needs_backfill {
            unlinked.push(idx);
        }
    }

    Ok(unlinked)
}

/// Submits the content-bearing elements of a to-many relationship for all documents in one batch.
/// One-to-many children are stamped with their parent's foreign key first. A single nested object
/// is written as a batch of one.
async fn write_children(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    documents: &mut [Document],
    stored: &[Record],
) -> crate::Result<()> {
    let mut positions = Vec::new();
    let mut children = Vec::new();

    for (idx, document) in documents.iter_mut().enumerate() {
        let Some(value) = document.get_mut(relationship.name()) else {
            continue;
        };

        match value {
            Value::Null => *value = Value::Array(vec![]),
            // A link to the relationship itself leaves its membership as it is.
            _ if document::is_link_only(value) => continue,
            Value::Object(_) => *value = Value::Array(vec![value.take()]),
            _ => (),
        }

        let Value::Array(items) = value else {
            return Err(CoreError::client(format!("`{relationship}` expects an array or an object.")));
        };

        for (pos, item) in items.iter_mut().enumerate() {
            if let Value::String(href) = item {
                *item = json!({ HREF: href.clone() });
            }

            let Value::Object(child) = item else {
                return Err(CoreError::client(format!(
                    "Elements of `{relationship}` must be objects or hrefs."
                )));
            };

            if document::is_link_only_object(child) {
                continue;
            }

            if let RelationKind::OneToMany { referenced, foreign_key } = relationship.kind() {
                if let Some(inverse) = relationship.inverse() {
                    child.remove(inverse.name());
                }

                let related = relationship.related();

                for (column, value) in foreign_key_values(foreign_key, referenced, &stored[idx])? {
                    let name = related
                        .find_property_by_column(&column)
                        .map(|p| p.name().to_owned())
                        .unwrap_or(column);

                    child.insert(name, Value::from(value));
                }
            }

            positions.push((idx, pos));
            children.push(child.clone());
        }
    }

    if children.is_empty() {
        return Ok(());
    }

    let written = submit(ctx, relationship, children).await?;

    for ((idx, pos), child) in positions.into_iter().zip(written) {
        if let Some(Value::Array(items)) = documents[idx].get_mut(relationship.name()) {
            items[pos] = Value::Object(child);
        }
    }

    Ok(())
}

async fn submit(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    children: Vec<Document>,
) -> crate::Result<Vec<Document>> {
    let submitted = children.len();
    let command = NestedWrite {
        collection: relationship.related(),
        documents: children,
    };

    let result = ctx.front_door.nested_write(&ctx.nested(), command).await?;

    if result.documents.len() != submitted {
        return Err(CoreError::invariant(format!(
            "Nested write of {relationship} returned {} of {submitted} documents.",
            result.documents.len()
        )));
    }

    Ok(result.documents)
}

async fn backfill_foreign_keys(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    documents: &[Document],
    stored: &[Record],
    backfill: Vec<(usize, Relationship)>,
) -> crate::Result<()> {
    let mut patches: Vec<(usize, Record)> = Vec::new();

    for (idx, relationship) in backfill {
        let RelationKind::ManyToOne { foreign_key, referenced } = relationship.kind() else {
            continue;
        };

        let related = relationship.related();
        let child_value = documents[idx].get(relationship.name()).unwrap_or(&Value::Null);
        let child = related.decode_key(&reference_key(&related, child_value)?)?;
        let values = foreign_key_values(foreign_key, referenced, &child)?;

        match patches.iter_mut().find(|(i, _)| *i == idx) {
            Some((_, record)) => record.merge(values),
            None => {
                let mut record = stored[idx]
                    .select(collection.primary_index().columns())
                    .ok_or_else(|| CoreError::invariant("Stored row without primary key."))?;

                record.merge(values);
                patches.push((idx, record));
            }
        }
    }

    let records: Vec<Record> = patches.into_iter().map(|(_, record)| record).collect();

    tracing::trace!(collection = collection.name(), rows = records.len(), "Backfilling foreign keys.");
    ctx.conn.upsert_records(collection, records).await?;

    Ok(())
}

fn desired_memberships(
    relationship: &Relationship,
    documents: &[Document],
    stored: &[Record],
) -> crate::Result<Vec<Membership>> {
    let collection = relationship.collection();
    let related = relationship.related();
    let mut memberships = Vec::new();

    // Only arrays describe a desired state; link-only fields were skipped when writing children.
    for (document, row) in documents.iter().zip(stored) {
        let Some(Value::Array(items)) = document.get(relationship.name()) else {
            continue;
        };

        let parent = row
            .select(collection.primary_index().columns())
            .ok_or_else(|| CoreError::invariant("Stored row without primary key."))?;

        let mut membership = Membership::new(parent);

        for item in items {
            let child = related.decode_key(&reference_key(&related, item)?)?;
            membership.push(child, document::is_link_only(item));
        }

        memberships.push(membership);
    }

    Ok(memberships)
}
