use super::{Function, Term};
use crate::{CoreError, EngineConfig};
use std::{iter::Peekable, str::CharIndices};

/// Parses the query string pairs of one request into a deterministic, sorted list of terms.
/// Parameters named after reserved words are dropped.
pub fn parse_query<'a, I>(params: I, config: &EngineConfig) -> crate::Result<Vec<Term>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut terms = Vec::new();

    for (name, value) in params {
        if config.is_reserved(name.trim()) {
            tracing::debug!(param = name, "Dropping reserved query parameter.");
            continue;
        }

        terms.push(parse(name, value)?);
    }

    terms.sort_by_cached_key(|term| term.to_string());

    Ok(terms)
}

/// Parses a single `name=value` pair.
///
/// - `eq(name,bob)` arrives as a bare name and is parsed as an expression.
/// - `limit=10`, `sort=-name,age` and friends become `limit(10)`, `sort(-name,age)`.
/// - Anything else is sugar for `eq(name,value)`.
pub fn parse(name: &str, value: &str) -> crate::Result<Term> {
    let name = name.trim();
    let value = value.trim();

    if name.is_empty() {
        return Err(CoreError::client("Query parameter without a name."));
    }

    if name.contains('(') {
        if !value.is_empty() {
            return Err(CoreError::client(format!(
                "Unexpected value `{value}` after expression `{name}`."
            )));
        }

        return parse_expression(name);
    }

    if name.parse::<Function>().is_ok() {
        return parse_expression(&format!("{name}({value})"));
    }

    let literal = match unquote(value) {
        Some(unquoted) => Term::quoted(unquoted),
        None => Term::leaf(value),
    };

    Ok(Term::call("eq", vec![Term::leaf(name), literal]))
}

/// Parses a complete expression such as `and(eq(name,'bob'),gt(age,3))`.
pub fn parse_expression(input: &str) -> crate::Result<Term> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
    };

    let term = parser.term()?;
    parser.skip_whitespace();

    if let Some((pos, _)) = parser.chars.peek() {
        return Err(CoreError::client(format!(
            "Unexpected trailing input `{}` in `{input}`.",
            &input[*pos..]
        )));
    }

    if term.is_leaf() {
        return Err(CoreError::client(format!("`{input}` is not a function expression.")));
    }

    Ok(term)
}

fn unquote(value: &str) -> Option<&str> {
    let mut chars = value.chars();

    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '\'' || first == '"') => {
            Some(&value[1..value.len() - 1])
        }
        _ => None,
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn term(&mut self) -> crate::Result<Term> {
        self.skip_whitespace();

        match self.chars.peek() {
            Some((_, '\'' | '"')) => self.quoted(),
            Some(_) => {
                let token = self.word();
                self.skip_whitespace();

                if let Some((_, '(')) = self.chars.peek() {
                    self.chars.next();

                    if token.is_empty() {
                        return Err(CoreError::client(format!(
                            "Missing function name before `(` in `{}`.",
                            self.input
                        )));
                    }

                    let args = self.arguments()?;
                    Ok(Term::call(token, args))
                } else {
                    Ok(Term::leaf(token))
                }
            }
            None => Err(CoreError::client(format!("Unexpected end of `{}`.", self.input))),
        }
    }

    fn arguments(&mut self) -> crate::Result<Vec<Term>> {
        let mut args = Vec::new();
        self.skip_whitespace();

        if let Some((_, ')')) = self.chars.peek() {
            self.chars.next();
            return Ok(args);
        }

        loop {
            args.push(self.term()?);
            self.skip_whitespace();

            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ')')) => return Ok(args),
                Some((pos, c)) => {
                    return Err(CoreError::client(format!(
                        "Unexpected `{c}` at position {pos} in `{}`.",
                        self.input
                    )))
                }
                None => {
                    return Err(CoreError::client(format!(
                        "Unbalanced parentheses in `{}`.",
                        self.input
                    )))
                }
            }
        }
    }

    fn word(&mut self) -> String {
        let mut token = String::new();

        while let Some((_, c)) = self.chars.peek() {
            match c {
                '(' | ')' | ',' | '\'' | '"' => break,
                c => {
                    token.push(*c);
                    self.chars.next();
                }
            }
        }

        token.trim().to_owned()
    }

    fn quoted(&mut self) -> crate::Result<Term> {
        let (start, quote) = match self.chars.next() {
            Some(pair) => pair,
            None => return Err(CoreError::client(format!("Unexpected end of `{}`.", self.input))),
        };

        let mut token = String::new();

        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, escaped)) => token.push(escaped),
                    None => break,
                },
                Some((_, c)) if c == quote => return Ok(Term::quoted(token)),
                Some((_, c)) => token.push(c),
                None => break,
            }
        }

        Err(CoreError::client(format!(
            "Unterminated string starting at position {start} in `{}`.",
            self.input
        )))
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, c)) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(name: &str, value: &str) -> String {
        parse(name, value).unwrap().to_string()
    }

    #[test]
    fn bare_expressions() {
        assert_eq!(render("and(eq(name,bob),gt(age,3))", ""), "and(eq(name,bob),gt(age,3))");
        assert_eq!(render(" eq( name , 'a,b' ) ", ""), "eq(name,'a,b')");
        assert_eq!(render("distinct()", ""), "distinct()");
    }

    #[test]
    fn name_value_sugar() {
        assert_eq!(render("name", "bob"), "eq(name,bob)");
        assert_eq!(render("age", "42"), "eq(age,42)");
        assert_eq!(render("name", "'42'"), "eq(name,'42')");
        assert_eq!(render("name", "\"a b\""), "eq(name,'a b')");
        assert_eq!(render("name", "*ob"), "eq(name,*ob)");
        assert_eq!(render("owner", "null"), "eq(owner,null)");
    }

    #[test]
    fn statement_parameters() {
        assert_eq!(render("sort", "-name,age"), "sort(-name,age)");
        assert_eq!(render("limit", "10"), "limit(10)");
        assert_eq!(render("expands", "pets.tags"), "expands(pets.tags)");
        assert_eq!(render("pageSize", "5"), "pageSize(5)");
    }

    #[test]
    fn only_bare_words_read_as_identifiers() {
        let term = parse_expression("in(id,1,'two',null,true,three)").unwrap();
        let identifiers: Vec<_> = term.children().iter().map(Term::is_identifier).collect();

        assert_eq!(identifiers, vec![true, false, false, false, false, true]);
    }

    #[test]
    fn escaped_quotes() {
        let term = parse_expression(r"eq(name,'O\'Neil')").unwrap();
        assert_eq!(term.children()[1].token(), "O'Neil");
    }

    #[test]
    fn malformed_expressions() {
        for input in ["eq(name,bob", "eq(name,'bob)", "(name)", "eq(a)b", "name"] {
            let err = parse_expression(input).unwrap_err();
            assert!(matches!(err, CoreError::ClientRequest(_)), "{input}: {err}");
        }

        assert!(parse("eq(a,1)", "2").is_err());
        assert!(parse("", "2").is_err());
    }

    #[test]
    fn query_is_sorted_and_reserved_words_dropped() {
        let config = EngineConfig::default();
        let params = [("name", "bob"), ("SELECT", "x"), ("age", "3"), ("limit", "2")];
        let terms = parse_query(params, &config).unwrap();
        let rendered: Vec<_> = terms.iter().map(ToString::to_string).collect();

        assert_eq!(rendered, vec!["eq(age,3)", "eq(name,bob)", "limit(2)"]);
    }
}
