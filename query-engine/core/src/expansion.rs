//! Relationship expansion in two phases.
//!
//! The fetch phase walks the requested paths level by level. Each relationship on a level costs
//! one round trip for memberships (to-many only) and one for the missing rows, whatever the
//! number of parents. Everything lands in a [`RequestKeyCache`]. The assemble phase then builds
//! the nested output purely from the cache.

use crate::{
    document::{self, Document, HREF},
    CoreError, RequestContext, RequestKeyCache,
};
use indexmap::{IndexMap, IndexSet};
use query_structure::{Collection, EntityKey, Filter, QueryArguments, RelationKind, Relationship};
use serde_json::{json, Value};

/// Validated `expands` paths, spelled with the declared relationship names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandPaths {
    paths: Vec<String>,
}

impl ExpandPaths {
    /// Resolves every dotted path against the schema, starting at `collection`.
    pub fn resolve(collection: &Collection, raw: &[String], max_depth: usize) -> crate::Result<Self> {
        let mut paths = Vec::with_capacity(raw.len());

        for path in raw {
            let segments: Vec<&str> = path.split('.').map(str::trim).collect();

            if segments.len() > max_depth {
                return Err(CoreError::client(format!(
                    "Expansion `{path}` is deeper than the allowed {max_depth} levels."
                )));
            }

            let mut current = collection.clone();
            let mut canonical = Vec::with_capacity(segments.len());

            for segment in segments {
                if segment.is_empty() {
                    return Err(CoreError::client(format!("Malformed expansion path `{path}`.")));
                }

                let relationship = current.find_relationship(segment)?;
                canonical.push(relationship.name().to_owned());
                current = relationship.related();
            }

            let canonical = canonical.join(".");

            if !paths.contains(&canonical) {
                paths.push(canonical);
            }
        }

        Ok(Self { paths })
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `path` is one of the requested paths or a prefix of one.
    pub fn covers(&self, path: &str) -> bool {
        self.paths
            .iter()
            .any(|p| p == path || (p.starts_with(path) && p[path.len()..].starts_with('.')))
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

struct Level {
    collection: Collection,
    path: String,
    keys: Vec<EntityKey>,
}

/// Expands `documents` of `collection` along `expands` and attaches link placeholders to every
/// relationship that is not expanded.
pub async fn expand(
    ctx: &RequestContext<'_>,
    collection: &Collection,
    documents: Vec<Document>,
    expands: &[String],
) -> crate::Result<Vec<Document>> {
    let paths = ExpandPaths::resolve(collection, expands, ctx.config.max_expand_depth)?;
    let mut engine = Expansion {
        ctx,
        paths,
        cache: RequestKeyCache::new(),
    };

    let mut roots = Vec::with_capacity(documents.len());

    for document in documents {
        let key = document::key_of(collection, &document)?;

        if !engine.cache.insert(collection.id, key.clone(), document) {
            return Err(CoreError::invariant(format!(
                "`{}` with key `{key}` was resolved twice.",
                collection.name()
            )));
        }

        roots.push(key);
    }

    engine.fetch(collection, &roots).await?;

    tracing::trace!(cached = engine.cache.len(), "Expansion fetch phase complete.");

    roots.iter().map(|key| engine.assemble(collection, key, "")).collect()
}

struct Expansion<'a, 'c> {
    ctx: &'a RequestContext<'c>,
    paths: ExpandPaths,
    cache: RequestKeyCache,
}

impl Expansion<'_, '_> {
    async fn fetch(&mut self, collection: &Collection, roots: &[EntityKey]) -> crate::Result<()> {
        if self.paths.is_empty() {
            return Ok(());
        }

        let mut frontier = vec![Level {
            collection: collection.clone(),
            path: String::new(),
            keys: roots.iter().cloned().collect::<IndexSet<_>>().into_iter().collect(),
        }];

        while !frontier.is_empty() {
            let mut next = Vec::new();

            for level in frontier {
                for relationship in level.collection.relationships() {
                    let path = join(&level.path, relationship.name());

                    if !self.paths.covers(&path) {
                        continue;
                    }

                    let keys = self.fetch_relationship(&relationship, &level.keys).await?;

                    if !keys.is_empty() {
                        next.push(Level {
                            collection: relationship.related(),
                            path,
                            keys,
                        });
                    }
                }
            }

            frontier = next;
        }

        Ok(())
    }

    /// Learns the memberships of `relationship` for all `parents` and loads the child rows not
    /// cached yet. Returns the distinct child keys.
    async fn fetch_relationship(
        &mut self,
        relationship: &Relationship,
        parents: &[EntityKey],
    ) -> crate::Result<Vec<EntityKey>> {
        let collection = relationship.collection();
        let related = relationship.related();

        match relationship.kind() {
            RelationKind::ManyToOne { .. } => {
                for parent in parents {
                    if self.cache.has_members(relationship.id, parent) {
                        continue;
                    }

                    let document = self
                        .cache
                        .get(collection.id, parent)
                        .ok_or_else(|| CoreError::invariant(format!("Parent `{parent}` of {relationship} not cached.")))?;

                    let child = match document.get(relationship.name()).and_then(document::reference_href) {
                        Some(href) => vec![related.key_from_href(href)?],
                        None => vec![],
                    };

                    self.cache.set_members(relationship.id, parent.clone(), child);
                }
            }
            _ => {
                let unknown: Vec<&EntityKey> = parents
                    .iter()
                    .filter(|parent| !self.cache.has_members(relationship.id, parent))
                    .collect();

                if !unknown.is_empty() {
                    let records = unknown
                        .iter()
                        .map(|key| collection.decode_key(key))
                        .collect::<query_structure::Result<Vec<_>>>()?;

                    let pairs = self.ctx.conn.get_related_record_ids(relationship, &records).await?;
                    let mut grouped: IndexMap<EntityKey, IndexSet<EntityKey>> = IndexMap::new();

                    for (parent, child) in pairs {
                        let parent = collection.key_of(&parent)?;
                        let child = related.key_of(&child)?;
                        grouped.entry(parent).or_default().insert(child);
                    }

                    for parent in unknown {
                        let children = grouped.swap_remove(parent).unwrap_or_default();
                        self.cache
                            .set_members(relationship.id, parent.clone(), children.into_iter().collect());
                    }
                }
            }
        }

        let mut children = IndexSet::new();

        for parent in parents {
            if let Some(members) = self.cache.members(relationship.id, parent) {
                children.extend(members.iter().cloned());
            }
        }

        let children: Vec<EntityKey> = children.into_iter().collect();
        self.load(&related, &children).await?;

        Ok(children)
    }

    /// Fetches the rows of `keys` that are not cached yet, in a single round trip.
    async fn load(&mut self, collection: &Collection, keys: &[EntityKey]) -> crate::Result<()> {
        let missing = keys
            .iter()
            .filter(|key| !self.cache.contains(collection.id, key))
            .map(|key| collection.decode_key(key))
            .collect::<query_structure::Result<Vec<_>>>()?;

        if missing.is_empty() {
            return Ok(());
        }

        let args = QueryArguments::new(collection.clone())
            .with_filter(Filter::records_in(collection.primary_index(), &missing))
            .with_stable_order();

        let rows = self.ctx.conn.get_many_records(args).await?;

        tracing::trace!(collection = collection.name(), requested = missing.len(), fetched = rows.len());

        for row in rows {
            let (key, document) = document::shape_record(collection, row, self.ctx.base_url())?;

            if !self.cache.insert(collection.id, key.clone(), document) {
                return Err(CoreError::invariant(format!(
                    "`{key}` of `{}` was fetched twice in one expansion batch.",
                    collection.name()
                )));
            }
        }

        Ok(())
    }

    fn assemble(&self, collection: &Collection, key: &EntityKey, path: &str) -> crate::Result<Document> {
        let mut document = self
            .cache
            .get(collection.id, key)
            .cloned()
            .ok_or_else(|| CoreError::invariant(format!("`{key}` of `{}` missing from cache.", collection.name())))?;

        for relationship in collection.relationships() {
            let child_path = join(path, relationship.name());
            let related = relationship.related();

            if !self.paths.covers(&child_path) {
                if relationship.is_to_many() {
                    let href = format!("{}/{}", collection.href(self.ctx.base_url(), key), relationship.name());
                    document.insert(relationship.name().to_owned(), json!({ HREF: href }));
                }
                continue;
            }

            let members = self.cache.members(relationship.id, key).ok_or_else(|| {
                CoreError::invariant(format!("{relationship} of `{key}` was never fetched."))
            })?;

            let mut expanded = Vec::with_capacity(members.len());

            // Dangling references have no cached row and drop out.
            for member in members {
                if self.cache.contains(related.id, member) {
                    expanded.push(Value::Object(self.assemble(&related, member, &child_path)?));
                }
            }

            let value = if relationship.is_many_to_one() {
                expanded.pop().unwrap_or(Value::Null)
            } else {
                Value::Array(expanded)
            };

            document.insert(relationship.name().to_owned(), value);
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_schema;

    #[test]
    fn paths_are_canonical_and_validated() {
        let schema = test_schema();
        let owners = schema.find_collection("owners").unwrap();

        let paths = ExpandPaths::resolve(&owners, &["PETS.Tags".to_owned(), "pets".to_owned()], 10).unwrap();

        assert!(paths.covers("pets"));
        assert!(paths.covers("pets.tags"));
        assert!(!paths.covers("pets.owner"));
        assert!(!paths.covers("pe"));

        let err = ExpandPaths::resolve(&owners, &["pets.toys".to_owned()], 10).unwrap_err();
        assert!(err.is_not_found());

        let err = ExpandPaths::resolve(&owners, &["pets.owner.pets".to_owned()], 2).unwrap_err();
        assert!(err.is_client_error());
    }
}
