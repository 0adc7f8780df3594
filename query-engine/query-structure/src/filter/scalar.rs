use resource_value::ResourceValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarFilter {
    pub column: String,
    pub condition: ScalarCondition,
}

/// `Like` patterns use `%` for any run of characters and `_` for a single character; `\` escapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarCondition {
    Equals(ResourceValue),
    NotEquals(ResourceValue),
    LessThan(ResourceValue),
    LessThanOrEquals(ResourceValue),
    GreaterThan(ResourceValue),
    GreaterThanOrEquals(ResourceValue),
    In(Vec<ResourceValue>),
    NotIn(Vec<ResourceValue>),
    Like(String),
    NotLike(String),
    IsNull,
    IsNotNull,
}

impl ScalarCondition {
    pub fn invert(self) -> Self {
        match self {
            Self::Equals(v) => Self::NotEquals(v),
            Self::NotEquals(v) => Self::Equals(v),
            Self::LessThan(v) => Self::GreaterThanOrEquals(v),
            Self::LessThanOrEquals(v) => Self::GreaterThan(v),
            Self::GreaterThan(v) => Self::LessThanOrEquals(v),
            Self::GreaterThanOrEquals(v) => Self::LessThan(v),
            Self::In(v) => Self::NotIn(v),
            Self::NotIn(v) => Self::In(v),
            Self::Like(p) => Self::NotLike(p),
            Self::NotLike(p) => Self::Like(p),
            Self::IsNull => Self::IsNotNull,
            Self::IsNotNull => Self::IsNull,
        }
    }
}

/// Escapes `%`, `_` and `\` so the text matches itself inside a `Like` pattern.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Turns a `*` wildcard value into a `Like` pattern.
pub fn wildcard_to_like(value: &str) -> String {
    value.split('*').map(escape_like).collect::<Vec<_>>().join("%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_become_like_patterns() {
        assert_eq!(wildcard_to_like("ab*"), "ab%");
        assert_eq!(wildcard_to_like("*50%*"), "%50\\%%");
    }
}
