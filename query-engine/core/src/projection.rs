use crate::document::{Document, HREF};
use query_structure::WildcardPattern;
use serde_json::Value;

/// Include/exclude filtering of output documents by dotted attribute path.
///
/// Paths match case-insensitively and may use `*` and `?`. Arrays do not add a path segment.
/// With includes present only matching attributes (and the ancestors needed to reach them)
/// remain. Excludes always win. `href` is only dropped by an exact exclude.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    includes: Vec<WildcardPattern>,
    excludes: Vec<WildcardPattern>,
}

impl Projection {
    pub fn new(includes: &[String], excludes: &[String]) -> Self {
        Self {
            includes: includes.iter().map(|p| WildcardPattern::new(p)).collect(),
            excludes: excludes.iter().map(|p| WildcardPattern::new(p)).collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub fn apply(&self, document: &mut Document) {
        if !self.is_noop() {
            self.walk(document, "", self.includes.is_empty());
        }
    }

    fn walk(&self, document: &mut Document, prefix: &str, included: bool) {
        document.retain(|name, value| {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };

            if name == HREF {
                return !self.excludes.iter().any(|p| p.as_str().eq_ignore_ascii_case(&path));
            }

            if self.excludes.iter().any(|p| p.matches(&path)) {
                return false;
            }

            let fully_included = included || self.includes.iter().any(|p| p.matches(&path));

            if !fully_included && !self.is_ancestor_of_include(&path) {
                return false;
            }

            self.descend(value, &path, fully_included);
            true
        });
    }

    fn descend(&self, value: &mut Value, path: &str, included: bool) {
        match value {
            Value::Object(object) => self.walk(object, path, included),
            Value::Array(items) => {
                for item in items {
                    self.descend(item, path, included);
                }
            }
            _ => (),
        }
    }

    /// Whether some include pattern points below `path`.
    fn is_ancestor_of_include(&self, path: &str) -> bool {
        let depth = path.split('.').count();

        self.includes.iter().any(|include| {
            let segments: Vec<&str> = include.as_str().split('.').collect();

            segments.len() > depth && WildcardPattern::new(&segments[..depth].join(".")).matches(path)
        })
    }
}
