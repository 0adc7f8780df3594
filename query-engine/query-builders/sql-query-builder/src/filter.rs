use crate::Context;
use query_structure::{Filter, KeyInFilter, ResourceValue, ScalarCondition, ScalarFilter};

/// Renders filters into SQL conditions while collecting bound parameters. Literal values never
/// appear in the SQL text.
pub struct FilterBuilder<'a> {
    ctx: &'a Context,
    params: Vec<ResourceValue>,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx, params: vec![] }
    }

    pub fn ctx(&self) -> &Context {
        self.ctx
    }

    /// Binds a value and returns its placeholder.
    pub fn param(&mut self, value: ResourceValue) -> String {
        self.params.push(value);
        self.ctx.placeholder(self.params.len())
    }

    pub fn into_params(self) -> Vec<ResourceValue> {
        self.params
    }

    /// `None` for filters that match everything.
    pub fn visit(&mut self, filter: &Filter) -> Option<String> {
        match filter {
            Filter::Empty => None,
            Filter::And(filters) if filters.is_empty() => None,
            Filter::And(filters) => Some(self.visit_group(filters, " AND ", "1=1")),
            Filter::Or(filters) => Some(self.visit_group(filters, " OR ", "1=0")),
            Filter::Not(filters) => {
                let inner = self.visit_group(filters, " AND ", "1=1");
                Some(format!("NOT {inner}"))
            }
            Filter::Scalar(sf) => Some(self.visit_scalar(sf)),
            Filter::KeyIn(kf) => Some(self.visit_key_in(kf)),
        }
    }

    fn visit_group(&mut self, filters: &[Filter], separator: &str, when_empty: &str) -> String {
        let parts: Vec<String> = filters.iter().filter_map(|f| self.visit(f)).collect();

        match parts.len() {
            0 => when_empty.to_owned(),
            _ => format!("({})", parts.join(separator)),
        }
    }

    fn visit_scalar(&mut self, filter: &ScalarFilter) -> String {
        let column = self.ctx.quote(&filter.column);

        match &filter.condition {
            ScalarCondition::Equals(v) => format!("{column} = {}", self.param(v.clone())),
            ScalarCondition::NotEquals(v) => format!("{column} <> {}", self.param(v.clone())),
            ScalarCondition::LessThan(v) => format!("{column} < {}", self.param(v.clone())),
            ScalarCondition::LessThanOrEquals(v) => format!("{column} <= {}", self.param(v.clone())),
            ScalarCondition::GreaterThan(v) => format!("{column} > {}", self.param(v.clone())),
            ScalarCondition::GreaterThanOrEquals(v) => format!("{column} >= {}", self.param(v.clone())),
            ScalarCondition::In(values) if values.is_empty() => "1=0".to_owned(),
            ScalarCondition::NotIn(values) if values.is_empty() => "1=1".to_owned(),
            ScalarCondition::In(values) => format!("{column} IN ({})", self.params_list(values)),
            ScalarCondition::NotIn(values) => format!("{column} NOT IN ({})", self.params_list(values)),
            ScalarCondition::Like(p) => format!("{column} LIKE {}", self.param(ResourceValue::from(p.as_str()))),
            ScalarCondition::NotLike(p) => {
                format!("{column} NOT LIKE {}", self.param(ResourceValue::from(p.as_str())))
            }
            ScalarCondition::IsNull => format!("{column} IS NULL"),
            ScalarCondition::IsNotNull => format!("{column} IS NOT NULL"),
        }
    }

    fn visit_key_in(&mut self, filter: &KeyInFilter) -> String {
        if filter.values.is_empty() {
            return "1=0".to_owned();
        }

        let columns: Vec<String> = filter.columns.iter().map(|c| self.ctx.quote(c)).collect();
        let tuples: Vec<String> = filter
            .values
            .iter()
            .map(|tuple| format!("({})", self.params_list(tuple)))
            .collect();

        format!("({}) IN ({})", columns.join(", "), tuples.join(", "))
    }

    fn params_list(&mut self, values: &[ResourceValue]) -> String {
        values
            .iter()
            .map(|v| self.param(v.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
