use query_core::{CoreError, EngineConfig};
use query_structure::{Collection, EntityKey, InternalSchema, Relationship};

/// The resource a request path addresses.
///
/// - `/<collection>`
/// - `/<collection>/<key>[,<key>...]`
/// - `/<collection>/<key>/<relationship>`
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub collection: Collection,
    pub keys: Option<Vec<EntityKey>>,
    pub relationship: Option<Relationship>,
}

impl Route {
    pub fn resolve(schema: &InternalSchema, config: &EngineConfig, path: &str) -> query_core::Result<Self> {
        let path = strip_base_path(config, path);
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

        let (collection, keys, relationship) = match segments.as_slice() {
            [collection] => (collection, None, None),
            [collection, keys] => (collection, Some(keys), None),
            [collection, keys, relationship] => (collection, Some(keys), Some(relationship)),
            _ => return Err(CoreError::not_found(format!("No resource at `{path}`."))),
        };

        let collection = schema.find_collection_by_path(collection)?;

        let keys = keys
            .map(|segment| {
                segment
                    .split(',')
                    .filter(|key| !key.is_empty())
                    .map(EntityKey::from_path_segment)
                    .collect::<query_structure::Result<Vec<_>>>()
            })
            .transpose()?;

        if keys.as_ref().is_some_and(Vec::is_empty) {
            return Err(CoreError::client(format!("Empty key list in `{path}`.")));
        }

        let relationship = relationship
            .map(|name| collection.find_relationship(name))
            .transpose()?;

        if relationship.is_some() && keys.as_ref().map(Vec::len) != Some(1) {
            return Err(CoreError::client("A relationship route takes exactly one entity key."));
        }

        Ok(Self {
            collection,
            keys,
            relationship,
        })
    }

    /// The single key of the route, if it addresses exactly one entity.
    pub fn single_key(&self) -> Option<&EntityKey> {
        match self.keys.as_deref() {
            Some([key]) => Some(key),
            _ => None,
        }
    }
}

/// Removes the path prefix of the configured base URL, so `/api/owners` routes like `/owners`
/// under `http://host/api`.
pub(crate) fn strip_base_path<'a>(config: &EngineConfig, path: &'a str) -> &'a str {
    let prefix = url::Url::parse(config.base_url())
        .map(|url| url.path().trim_end_matches('/').to_owned())
        .unwrap_or_default();

    if prefix.is_empty() {
        return path;
    }

    match path.strip_prefix(prefix.as_str()) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}
