//! Turns parsed terms into backend-neutral query arguments against one collection.

use crate::{
    term::{Function, Term},
    CoreError, EngineConfig,
};
use query_structure::{
    wildcard_to_like, Collection, Filter, OrderBy, QueryArguments, ResourceValue, ScalarCondition,
};

/// The outcome of translating the terms of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub offset: usize,
    pub limit: usize,
    /// One-based page number derived from `offset` and `limit`.
    pub page_num: usize,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub expands: Vec<String>,
    pub distinct: bool,
    /// Storage columns referenced by the filter and the ordering, first-seen order.
    pub columns_used: Vec<String>,
}

impl TranslatedQuery {
    /// Arguments for one page. One extra row is requested to learn whether a next page exists.
    pub fn page_arguments(&self, collection: &Collection) -> QueryArguments {
        QueryArguments::new(collection.clone())
            .with_filter(self.filter.clone())
            .with_order_by(self.order_by.clone())
            .with_skip(Some(self.offset).filter(|offset| *offset > 0))
            .with_take(Some(self.limit + 1))
            .with_stable_order()
            .with_distinct(self.distinct)
    }

    /// Arguments covering every matching row, ignoring pagination.
    pub fn unbounded_arguments(&self, collection: &Collection) -> QueryArguments {
        QueryArguments::new(collection.clone())
            .with_filter(self.filter.clone())
            .with_order_by(self.order_by.clone())
            .with_stable_order()
    }
}

/// Translates `terms` for `collection`. Attribute names resolve to storage columns through the
/// collection's properties; unknown names pass through unchanged.
pub fn translate(terms: &[Term], collection: &Collection, config: &EngineConfig) -> crate::Result<TranslatedQuery> {
    let translator = Translator { collection, config };
    let mut statement = Statement::default();
    let mut filters = Vec::new();

    for term in terms {
        match term.function() {
            Some(function) if function.is_statement() => translator.statement(function, term, &mut statement)?,
            _ => filters.push(translator.filter(term)?),
        }
    }

    let filter = conjunction(filters);

    let limit = statement
        .limit
        .or(statement.page_size)
        .unwrap_or(config.default_page_size)
        .min(config.max_page_size);

    if limit == 0 {
        return Err(CoreError::client("Page size must be at least 1."));
    }

    let offset = match (statement.offset, statement.page) {
        (Some(offset), _) => offset,
        (None, Some(0)) => return Err(CoreError::client("Page numbers start at 1.")),
        (None, Some(page)) => (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| CoreError::client("Page number out of range."))?,
        (None, None) => 0,
    };

    let mut columns_used: Vec<String> = Vec::new();

    for column in filter
        .columns()
        .into_iter()
        .chain(statement.order_by.iter().map(|o| o.column.as_str()))
    {
        if !columns_used.iter().any(|c| c == column) {
            columns_used.push(column.to_owned());
        }
    }

    Ok(TranslatedQuery {
        filter,
        order_by: statement.order_by,
        offset,
        limit,
        page_num: (offset / limit).saturating_add(1),
        includes: statement.includes,
        excludes: statement.excludes,
        expands: statement.expands,
        distinct: statement.distinct,
        columns_used,
    })
}

fn conjunction(mut filters: Vec<Filter>) -> Filter {
    match filters.len() {
        0 => Filter::empty(),
        1 => filters.remove(0),
        _ => Filter::and(filters),
    }
}

#[derive(Default)]
struct Statement {
    order_by: Vec<OrderBy>,
    offset: Option<usize>,
    limit: Option<usize>,
    page: Option<usize>,
    page_size: Option<usize>,
    includes: Vec<String>,
    excludes: Vec<String>,
    expands: Vec<String>,
    distinct: bool,
}

struct Translator<'a> {
    collection: &'a Collection,
    config: &'a EngineConfig,
}

impl Translator<'_> {
    fn statement(&self, function: Function, term: &Term, statement: &mut Statement) -> crate::Result<()> {
        match function {
            Function::Sort => {
                for child in term.children() {
                    let name = self.leaf(term, child)?;

                    let order = match name.strip_prefix('-') {
                        Some(name) => OrderBy::descending(self.column(name)?),
                        None => OrderBy::ascending(self.column(name.trim_start_matches('+'))?),
                    };

                    statement.order_by.push(order);
                }
            }
            Function::Offset => statement.offset = Some(self.number(term)?),
            Function::Limit => statement.limit = Some(self.number(term)?),
            Function::Page => statement.page = Some(self.number(term)?),
            Function::PageSize => statement.page_size = Some(self.number(term)?),
            Function::Includes => statement.includes.extend(self.paths(term)?),
            Function::Excludes => statement.excludes.extend(self.paths(term)?),
            Function::Expands => statement.expands.extend(self.paths(term)?),
            Function::Distinct => {
                if !term.children().is_empty() {
                    return Err(CoreError::client(format!("`{term}` takes no arguments.")));
                }
                statement.distinct = true;
            }
            _ => return self.unknown(term),
        }

        Ok(())
    }

    fn filter(&self, term: &Term) -> crate::Result<Filter> {
        let Some(function) = term.function() else {
            return self.unknown(term);
        };

        let filter = match function {
            Function::And => Filter::and(self.nested(term)?),
            Function::Or => Filter::or(self.nested(term)?),
            Function::Not => Filter::not(self.nested(term)?),
            Function::Key => self.key(term)?,
            Function::N | Function::Nn => {
                let condition = if function == Function::N {
                    ScalarCondition::IsNull
                } else {
                    ScalarCondition::IsNotNull
                };

                if term.children().is_empty() {
                    return Err(CoreError::client(format!("`{term}` needs at least one attribute.")));
                }

                let filters = term
                    .children()
                    .iter()
                    .map(|child| Ok(Filter::scalar(self.identifier(term, child)?, condition.clone())))
                    .collect::<crate::Result<Vec<_>>>()?;

                conjunction(filters)
            }
            function if function.is_comparison() => self.comparison(function, term)?,
            _ => return self.unknown(term),
        };

        Ok(filter)
    }

    fn comparison(&self, function: Function, term: &Term) -> crate::Result<Filter> {
        let children = term.children();

        let Some((first, rest)) = children.split_first() else {
            return Err(CoreError::client(format!("`{term}` needs an attribute.")));
        };

        let column = self.identifier(term, first)?;

        if rest.is_empty() {
            return Err(CoreError::client(format!("`{term}` needs at least one value.")));
        }

        let binary = |expected: usize| {
            if rest.len() == expected {
                Ok(())
            } else {
                Err(CoreError::client(format!("`{term}` takes exactly {expected} value(s).")))
            }
        };

        let condition = match function {
            Function::Eq | Function::Ne if rest.len() > 1 => {
                let values = self.values(&column, term, rest)?;

                if function == Function::Eq {
                    ScalarCondition::In(values)
                } else {
                    ScalarCondition::NotIn(values)
                }
            }
            Function::Eq | Function::Ne => {
                let raw = &rest[0];
                self.guard_value(term, raw)?;

                let condition = if raw.token().contains('*') {
                    ScalarCondition::Like(wildcard_to_like(raw.token()))
                } else {
                    match self.value(&column, raw)? {
                        ResourceValue::Null => ScalarCondition::IsNull,
                        value => ScalarCondition::Equals(value),
                    }
                };

                if function == Function::Ne {
                    condition.invert()
                } else {
                    condition
                }
            }
            Function::Lt | Function::Le | Function::Gt | Function::Ge => {
                binary(1)?;
                self.guard_value(term, &rest[0])?;
                let value = self.value(&column, &rest[0])?;

                if value.is_null() {
                    return Err(CoreError::client(format!("`{term}` cannot compare against null.")));
                }

                match function {
                    Function::Lt => ScalarCondition::LessThan(value),
                    Function::Le => ScalarCondition::LessThanOrEquals(value),
                    Function::Gt => ScalarCondition::GreaterThan(value),
                    _ => ScalarCondition::GreaterThanOrEquals(value),
                }
            }
            Function::In => ScalarCondition::In(self.values(&column, term, rest)?),
            Function::Out => ScalarCondition::NotIn(self.values(&column, term, rest)?),
            Function::W | Function::Sw | Function::Ew => {
                binary(1)?;
                self.guard_value(term, &rest[0])?;
                let inner = wildcard_to_like(rest[0].token());

                ScalarCondition::Like(match function {
                    Function::W => format!("%{inner}%"),
                    Function::Sw => format!("{inner}%"),
                    _ => format!("%{inner}"),
                })
            }
            _ => return self.unknown(term),
        };

        Ok(Filter::scalar(column, condition))
    }

    /// `_key(index, key, key...)`: rows whose index values equal one of the encoded keys.
    fn key(&self, term: &Term) -> crate::Result<Filter> {
        let children = term.children();

        let Some((index_name, keys)) = children.split_first() else {
            return Err(CoreError::client(format!("`{term}` needs an index name.")));
        };

        let index = self.collection.find_index(self.leaf(term, index_name)?)?;

        let records = keys
            .iter()
            .map(|key| {
                let key = query_structure::EntityKey::from_path_segment(key.token())?;
                Ok(key.decode(index)?)
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Filter::records_in(index, &records))
    }

    fn nested(&self, term: &Term) -> crate::Result<Vec<Filter>> {
        if term.children().is_empty() {
            return Err(CoreError::client(format!("`{term}` needs at least one condition.")));
        }

        term.children()
            .iter()
            .map(|child| {
                if child.is_leaf() {
                    return Err(CoreError::client(format!(
                        "`{term}` expects conditions, found `{child}`."
                    )));
                }
                self.filter(child)
            })
            .collect()
    }

    fn values(&self, column: &str, term: &Term, raws: &[Term]) -> crate::Result<Vec<ResourceValue>> {
        raws.iter()
            .map(|raw| {
                self.guard_value(term, raw)?;
                self.value(column, raw)
            })
            .collect()
    }

    /// Literal value of an argument, coerced to the property type when the column is known.
    fn value(&self, column: &str, raw: &Term) -> crate::Result<ResourceValue> {
        if raw.is_call() {
            return Err(CoreError::client(format!("Expected a value, found `{raw}`.")));
        }

        let value = if raw.is_quoted() {
            ResourceValue::String(raw.token().to_owned())
        } else {
            ResourceValue::parse_literal(raw.token())
        };

        match self.collection.find_property_by_column(column) {
            Some(property) => property
                .coerce(value)
                .map_err(|err| CoreError::client(format!("Invalid value `{raw}` for `{}`: {err}", property.name()))),
            None => Ok(value),
        }
    }

    fn identifier(&self, term: &Term, child: &Term) -> crate::Result<String> {
        if !child.is_identifier() {
            return Err(CoreError::client(format!(
                "`{term}` expects an attribute name first, found `{child}`."
            )));
        }

        self.column(child.token())
    }

    /// Maps an attribute name to its storage column.
    fn column(&self, name: &str) -> crate::Result<String> {
        if name.is_empty() {
            return Err(CoreError::client("Empty attribute name."));
        }

        if self.config.is_reserved(name) {
            return Err(CoreError::client(format!("`{name}` is a reserved word.")));
        }

        Ok(self
            .collection
            .find_property(name)
            .map(|p| p.db_name().to_owned())
            .unwrap_or_else(|| name.to_owned()))
    }

    fn guard_value(&self, term: &Term, raw: &Term) -> crate::Result<()> {
        if !raw.is_quoted() && self.config.is_reserved(raw.token()) {
            return Err(CoreError::client(format!(
                "`{term}` uses the reserved word `{}` as a value.",
                raw.token()
            )));
        }

        Ok(())
    }

    fn leaf<'t>(&self, term: &Term, child: &'t Term) -> crate::Result<&'t str> {
        if child.is_call() {
            return Err(CoreError::client(format!("`{term}` expects names, found `{child}`.")));
        }

        Ok(child.token())
    }

    fn number(&self, term: &Term) -> crate::Result<usize> {
        match term.children() {
            [child] if child.is_leaf() => child
                .token()
                .parse()
                .map_err(|_| CoreError::client(format!("`{term}` expects a non-negative integer."))),
            _ => Err(CoreError::client(format!("`{term}` takes exactly one number."))),
        }
    }

    fn paths(&self, term: &Term) -> crate::Result<Vec<String>> {
        let mut paths = Vec::with_capacity(term.children().len());

        for child in term.children() {
            let path = self.leaf(term, child)?;

            if !path.is_empty() {
                paths.push(path.to_owned());
            }
        }

        Ok(paths)
    }

    fn unknown<T>(&self, term: &Term) -> crate::Result<T> {
        Err(CoreError::client(format!("Unknown function in `{term}`.")))
    }
}
