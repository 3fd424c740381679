//! The validated request model built by the parsing passes.

use crate::error::RequestError;
use crate::field_set::FieldSet;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Endpoint kind a conversion is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// List endpoint: sorting, filters and pagination apply.
    Index,
    /// Single-entity endpoint: looked up by id.
    Show,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Action::Index),
            "show" => Ok(Action::Show),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Comparison operator of a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    Null,
    NotNull,
}

impl FilterOp {
    /// All operators, longest token first so prefix matching is unambiguous.
    pub const ALL: [FilterOp; 10] = [
        FilterOp::NotLike,
        FilterOp::NotNull,
        FilterOp::Like,
        FilterOp::Null,
        FilterOp::Gte,
        FilterOp::Lte,
        FilterOp::Ne,
        FilterOp::Eq,
        FilterOp::Gt,
        FilterOp::Lt,
    ];

    /// Token as written in a filter string.
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "like",
            FilterOp::NotLike => "not like",
            FilterOp::Null => "null",
            FilterOp::NotNull => "not null",
        }
    }

    /// SQL rendering of the operator.
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::NotLike => "NOT LIKE",
            FilterOp::Null => "IS NULL",
            FilterOp::NotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator needs a right-hand value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOp::Null | FilterOp::NotNull)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for FilterOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

/// A parsed `field op [value]` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    pub field: String,
    pub op: FilterOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterExpression {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Option<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// 1-based page window for index requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Validated, enriched form of one request.
///
/// Built pass by pass. Items that fail validation are dropped and the reason is kept
/// in `errors`; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestModel {
    /// Resource type identifier the request was dispatched against.
    pub resource_type: String,
    /// Singular name of the main resource, its key in `fields` and `filters`.
    pub resource: String,
    pub action: Action,
    pub fields: BTreeMap<String, FieldSet>,
    pub sorting: Vec<SortSpec>,
    pub filters: BTreeMap<String, Vec<FilterExpression>>,
    pub limits: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub errors: Vec<RequestError>,
}

impl RequestModel {
    pub fn new(
        resource_type: impl Into<String>,
        resource: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
            action,
            fields: BTreeMap::new(),
            sorting: Vec::new(),
            filters: BTreeMap::new(),
            limits: BTreeMap::new(),
            pagination: None,
            errors: Vec::new(),
        }
    }

    /// Field list of the main resource, if selected yet.
    pub fn main_fields(&self) -> Option<&FieldSet> {
        self.fields.get(&self.resource)
    }

    /// Selected keys other than the main resource, i.e. the eager-load set.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &FieldSet)> {
        self.fields
            .iter()
            .filter(|(key, _)| **key != self.resource)
            .map(|(key, set)| (key.as_str(), set))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn record(&mut self, error: RequestError) {
        tracing::trace!(target: "reqplan.convert", resource = %self.resource, %error, "dropped");
        self.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_op_tokens_are_ordered_longest_first() {
        for (i, a) in FilterOp::ALL.iter().enumerate() {
            for b in &FilterOp::ALL[i + 1..] {
                assert!(
                    !b.token().starts_with(a.token()),
                    "{} shadows {}",
                    a.token(),
                    b.token()
                );
            }
        }
    }

    #[test]
    fn pagination_offset() {
        assert_eq!(Pagination { page: 1, per_page: 15 }.offset(), 0);
        assert_eq!(Pagination { page: 3, per_page: 10 }.offset(), 20);
    }

    #[test]
    fn relations_skip_main_resource() {
        let mut model = RequestModel::new("Post", "post", Action::Index);
        model.fields.insert("post".into(), ["id"].into_iter().collect());
        model.fields.insert("tags".into(), ["name"].into_iter().collect());
        let keys: Vec<&str> = model.relations().map(|(k, _)| k).collect();
        assert_eq!(keys, ["tags"]);
    }

    #[test]
    fn model_serializes_errors_as_messages() {
        let mut model = RequestModel::new("Post", "post", Action::Show);
        model.record(RequestError::UnknownSortField {
            field: "age".into(),
        });
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["action"], "show");
        assert_eq!(json["errors"][0], "cannot sort by 'age'");
    }
}
