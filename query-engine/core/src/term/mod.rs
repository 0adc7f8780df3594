//! The predicate tree parsed out of query parameters.

mod parser;

pub use parser::{parse, parse_expression, parse_query};

use std::{fmt, str::FromStr};

/// A node of the predicate tree: a function call with ordered arguments, or a leaf token.
/// Leaves carry a quoted flag separating explicit string literals from identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    token: String,
    quoted: bool,
    args: Option<Vec<Term>>,
}

impl Term {
    pub fn leaf(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            quoted: false,
            args: None,
        }
    }

    pub fn quoted(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            quoted: true,
            args: None,
        }
    }

    pub fn call(token: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            token: token.into(),
            quoted: false,
            args: Some(args),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    pub fn is_call(&self) -> bool {
        self.args.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.args.is_none()
    }

    pub fn children(&self) -> &[Term] {
        self.args.as_deref().unwrap_or_default()
    }

    /// The recognised function of a call term.
    pub fn function(&self) -> Option<Function> {
        self.args.as_ref().and_then(|_| self.token.parse().ok())
    }

    /// A leaf reads as an identifier unless it is quoted or looks like a number, boolean or `null`.
    /// Comparisons take their first argument as an identifier and every other one as a literal.
    pub fn is_identifier(&self) -> bool {
        self.is_leaf() && !self.quoted && !query_structure::ResourceValue::is_non_string_literal(&self.token)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            None if self.quoted => write!(f, "'{}'", self.token.replace('\\', "\\\\").replace('\'', "\\'")),
            None => f.write_str(&self.token),
            Some(args) => {
                write!(f, "{}(", self.token)?;

                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }

                f.write_str(")")
            }
        }
    }
}

/// The fixed function vocabulary. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Out,
    And,
    Or,
    Not,
    /// Is null.
    N,
    /// Is not null.
    Nn,
    /// Contains.
    W,
    /// Starts with.
    Sw,
    /// Ends with.
    Ew,
    Sort,
    Offset,
    Limit,
    Page,
    PageSize,
    Includes,
    Excludes,
    Expands,
    Distinct,
    Key,
}

impl Function {
    /// Functions whose first argument names an attribute and whose other arguments are literals.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Function::Eq
                | Function::Ne
                | Function::Lt
                | Function::Le
                | Function::Gt
                | Function::Ge
                | Function::In
                | Function::Out
                | Function::N
                | Function::Nn
                | Function::W
                | Function::Sw
                | Function::Ew
        )
    }

    /// Functions routed to dedicated statement fields instead of the filter.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Function::Sort
                | Function::Offset
                | Function::Limit
                | Function::Page
                | Function::PageSize
                | Function::Includes
                | Function::Excludes
                | Function::Expands
                | Function::Distinct
        )
    }
}

impl FromStr for Function {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let function = match s.to_ascii_lowercase().as_str() {
            "eq" => Function::Eq,
            "ne" => Function::Ne,
            "lt" => Function::Lt,
            "le" => Function::Le,
            "gt" => Function::Gt,
            "ge" => Function::Ge,
            "in" => Function::In,
            "out" => Function::Out,
            "and" => Function::And,
            "or" => Function::Or,
            "not" => Function::Not,
            "n" => Function::N,
            "nn" => Function::Nn,
            "w" => Function::W,
            "sw" => Function::Sw,
            "ew" => Function::Ew,
            "sort" | "order" => Function::Sort,
            "offset" => Function::Offset,
            "limit" => Function::Limit,
            "page" | "pagenum" => Function::Page,
            "pagesize" => Function::PageSize,
            "includes" => Function::Includes,
            "excludes" => Function::Excludes,
            "expands" => Function::Expands,
            "distinct" => Function::Distinct,
            "_key" => Function::Key,
            _ => return Err(()),
        };

        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn renders_canonical_form() {
        let term = Term::call(
            "and",
            vec![
                Term::call("eq", vec![Term::leaf("name"), Term::quoted("O'Neil")]),
                Term::call("gt", vec![Term::leaf("age"), Term::leaf("3")]),
                Term::call("distinct", vec![]),
            ],
        );

        expect![[r#"and(eq(name,'O\'Neil'),gt(age,3),distinct())"#]].assert_eq(&term.to_string());
    }

    #[test]
    fn identifiers_versus_literals() {
        assert!(Term::leaf("name").is_identifier());
        assert!(!Term::leaf("42").is_identifier());
        assert!(!Term::leaf("null").is_identifier());
        assert!(!Term::quoted("name").is_identifier());
    }

    #[test]
    fn vocabulary_aliases() {
        assert_eq!("ORDER".parse(), Ok(Function::Sort));
        assert_eq!("pageNum".parse(), Ok(Function::Page));
        assert_eq!("_key".parse(), Ok(Function::Key));
        assert!("frobnicate".parse::<Function>().is_err());
    }
}
