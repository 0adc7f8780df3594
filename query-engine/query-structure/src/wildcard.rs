use regex::Regex;

/// A case-insensitive glob where `*` matches any run of characters and `?` exactly one.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?is)^");

        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                c => expr.push_str(&regex::escape(&c.to_string())),
            }
        }

        expr.push('$');

        // Every character outside the two wildcards is escaped above, so the expression is valid.
        let regex = Regex::new(&expr).unwrap_or_else(|_| unreachable!("escaped wildcard pattern `{expr}`"));

        Self {
            source: pattern.to_owned(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_wildcards(&self) -> bool {
        self.source.contains(['*', '?'])
    }

    pub fn matches(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        let pattern = WildcardPattern::new("a.*");

        assert!(pattern.matches("a.x"));
        assert!(pattern.matches("A.Secret"));
        assert!(!pattern.matches("b.x"));
        assert!(WildcardPattern::new("na?e").matches("name"));
        assert!(!WildcardPattern::new("na?e").matches("nae"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(WildcardPattern::new("a+b").matches("a+b"));
        assert!(!WildcardPattern::new("a+b").matches("aab"));
    }
}
