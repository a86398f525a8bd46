//! `find` criteria and how they reach the server.
//!
//! A [`Query`] is an ordered list of equality criteria. Planning it against a
//! resource's [`Schema`] splits it into query parameters the server evaluates
//! and filters applied to the fetched records.

use serde_json::Value;

use crate::record::Record;
use crate::schema::{QueryKind, Schema};

/// Equality criteria for [`Queryable::find`](crate::Queryable::find).
///
/// ```
/// use connectapi::Query;
///
/// let query = Query::new().eq("app_mode", "streamlit").eq("locked", false);
/// assert_eq!(query.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Vec<(String, Value)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    ///
    /// A later criterion on the same field replaces the earlier one.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.criteria.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = value,
            None => self.criteria.push((field, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.criteria.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Split the criteria according to `schema`'s query table.
    pub(crate) fn plan(&self, schema: &Schema) -> Plan {
        let mut plan = Plan::default();

        for (field, value) in &self.criteria {
            let record_filter = Filter {
                field: schema.wire_name(field).to_string(),
                expected: value.clone(),
            };

            match (schema.query_kind(field), param_value(value)) {
                (Some(QueryKind::Native(param)), Some(rendered)) => {
                    plan.params.push((param.to_string(), rendered));
                    plan.record_filters.push(record_filter);
                }
                (Some(QueryKind::ParamOnly(param)), Some(rendered)) => {
                    plan.params.push((param.to_string(), rendered.clone()));
                    plan.param_only.push((param.to_string(), rendered));
                }
                // Nothing to send for a null time bound or prefix.
                (Some(QueryKind::ParamOnly(_)), None) => {}
                _ => {
                    plan.filters.push(record_filter.clone());
                    plan.record_filters.push(record_filter);
                }
            }
        }

        plan
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |query, (field, value)| query.eq(field, value))
    }
}

/// A query split for one resource.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    /// Parameters for a server request, native and parameter-only alike.
    pub params: Vec<(String, String)>,
    /// Filters the server cannot evaluate.
    pub filters: Vec<Filter>,
    /// Every criterion that can be checked against a record.
    pub record_filters: Vec<Filter>,
    /// Parameters with no record counterpart.
    pub param_only: Vec<(String, String)>,
}

/// Client-side equality check on one wire field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub field: String,
    pub expected: Value,
}

impl Filter {
    /// An absent field never matches.
    pub fn matches(&self, record: &Record) -> bool {
        record
            .get(&self.field)
            .is_some_and(|actual| values_match(actual, &self.expected))
    }
}

/// Equality, treating a string and a scalar with the same rendering as equal
/// (`"42"` matches `42`, `"true"` matches `true`).
fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::Number(_) | Value::Bool(_)) => param_value(expected).as_deref() == Some(a),
        (Value::Number(_) | Value::Bool(_), Value::String(e)) => param_value(actual).as_deref() == Some(e),
        _ => actual == expected,
    }
}

/// Render a criterion value as a query parameter; `None` for null.
pub(crate) fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Overlay `extra` on `base`, replacing parameters with the same name.
pub(crate) fn merge_params(base: &[(String, String)], extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .filter(|(key, _)| !extra.iter().any(|(k, _)| k == key))
        .cloned()
        .collect();
    merged.extend(extra.iter().cloned());
    merged
}
