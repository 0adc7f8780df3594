//! Bringing a to-many relationship of freshly written parents in line with the submitted arrays.

use super::foreign_key_values;
use crate::{CoreError, RequestContext};
use query_connector::RecordFilter;
use query_structure::{Filter, Index, LinkTable, QueryArguments, RelationKind, Record, Relationship, ResourceValue};

/// The submitted members of one parent, as primary key fragments.
#[derive(Debug, Clone)]
pub(crate) struct Membership {
    parent: Record,
    children: Vec<Record>,
    /// Members referenced by href only. Their side of the relationship was not written yet.
    link_only: Vec<Record>,
}

impl Membership {
    pub(crate) fn new(parent: Record) -> Self {
        Self {
            parent,
            children: vec![],
            link_only: vec![],
        }
    }

    pub(crate) fn push(&mut self, child: Record, link_only: bool) {
        if self.children.contains(&child) {
            return;
        }

        if link_only {
            self.link_only.push(child.clone());
        }

        self.children.push(child);
    }
}

pub(crate) async fn reconcile(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    memberships: &[Membership],
) -> crate::Result<()> {
    tracing::trace!(%relationship, parents = memberships.len(), "Reconciling relationship.");

    match relationship.kind() {
        RelationKind::OneToMany { referenced, foreign_key } => {
            reconcile_one_to_many(ctx, relationship, referenced, foreign_key, memberships).await
        }
        RelationKind::ManyToMany { link } => reconcile_many_to_many(ctx, relationship, link, memberships).await,
        RelationKind::ManyToOne { .. } => Err(CoreError::invariant(format!(
            "{relationship} is not a to-many relationship."
        ))),
    }
}

async fn reconcile_one_to_many(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    referenced: &Index,
    foreign_key: &Index,
    memberships: &[Membership],
) -> crate::Result<()> {
    let related = relationship.related();
    let child_index = related.primary_index();
    let mut stale = Vec::with_capacity(memberships.len());

    for membership in memberships {
        let link = foreign_key_values(foreign_key, referenced, &membership.parent)?;

        if !membership.link_only.is_empty() {
            let updated = ctx
                .conn
                .update_records(&related, RecordFilter::from(membership.link_only.clone()), link.clone())
                .await?;

            if updated < membership.link_only.len() {
                return Err(CoreError::not_found(format!(
                    "{relationship} references entities of `{}` that do not exist.",
                    related.name()
                )));
            }
        }

        let owned = Filter::matches_record(&link);

        stale.push(match membership.children.is_empty() {
            true => owned,
            false => owned.and_also(Filter::not(vec![Filter::records_in(child_index, &membership.children)])),
        });
    }

    let stale = Filter::or(stale);
    let page = ctx.config.reconcile_page_size;
    let detach = foreign_key.all_nullable();

    loop {
        let args = QueryArguments::new(related.clone())
            .with_filter(stale.clone())
            .with_take(Some(page))
            .with_stable_order();

        let rows = ctx.conn.get_many_records(args).await?;

        if rows.is_empty() {
            break;
        }

        let selectors = rows
            .iter()
            .map(|row| row.select(child_index.columns()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CoreError::invariant(format!("Row of `{}` without primary key.", related.name())))?;

        let affected = if detach {
            let nulls: Record = foreign_key.columns().map(|c| (c.to_owned(), ResourceValue::Null)).collect();
            ctx.conn.update_records(&related, selectors.into(), nulls).await?
        } else {
            ctx.conn.delete_records(&related, selectors.into()).await?
        };

        tracing::trace!(%relationship, affected, detach, "Removed stale members.");

        if affected == 0 {
            return Err(CoreError::invariant(format!(
                "Reconciling {relationship} made no progress."
            )));
        }

        if rows.len() < page {
            break;
        }
    }

    Ok(())
}

async fn reconcile_many_to_many(
    ctx: &RequestContext<'_>,
    relationship: &Relationship,
    link: &LinkTable,
    memberships: &[Membership],
) -> crate::Result<()> {
    let mut rows = Vec::new();
    let mut stale = Vec::with_capacity(memberships.len());

    for membership in memberships {
        for child in &membership.children {
            let row = relationship
                .link_record(&membership.parent, child)
                .ok_or_else(|| CoreError::invariant(format!("Incomplete link row for {relationship}.")))?;

            rows.push(row);
        }

        let parent_values = relationship
            .collection()
            .primary_index()
            .values_of(&membership.parent)
            .ok_or_else(|| CoreError::invariant(format!("Incomplete parent key for {relationship}.")))?;

        let owned = Filter::matches_record(&link.parent_columns.iter().cloned().zip(parent_values).collect::<Record>());

        let kept = membership
            .children
            .iter()
            .map(|child| relationship.related().primary_index().values_of(child))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CoreError::invariant(format!("Incomplete child key for {relationship}.")))?;

        stale.push(match kept.is_empty() {
            true => owned,
            false => owned.and_also(Filter::not(vec![Filter::key_in(link.child_columns.clone(), kept)])),
        });
    }

    if !rows.is_empty() {
        ctx.conn.create_link_records(link, rows, true).await?;
    }

    let stale = Filter::or(stale);
    let page = ctx.config.reconcile_page_size;
    let columns: Vec<String> = link.parent_columns.iter().chain(&link.child_columns).cloned().collect();

    loop {
        let rows = ctx.conn.get_link_records(link, stale.clone(), Some(page)).await?;

        if rows.is_empty() {
            break;
        }

        let values = rows
            .iter()
            .map(|row| columns.iter().map(|c| row.get(c).cloned()).collect::<Option<Vec<_>>>())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CoreError::invariant(format!("Incomplete row in link table `{}`.", link.table)))?;

        let affected = ctx
            .conn
            .delete_link_records(link, Filter::key_in(columns.clone(), values))
            .await?;

        if affected == 0 {
            return Err(CoreError::invariant(format!(
                "Reconciling {relationship} made no progress."
            )));
        }

        if rows.len() < page {
            break;
        }
    }

    Ok(())
}
