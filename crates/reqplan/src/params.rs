//! Raw, untrusted request parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use percent_encoding::percent_decode_str;

/// One or more raw strings supplied for a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    One(String),
    Many(Vec<String>),
}

impl RawValue {
    /// Iterate the raw strings in input order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            RawValue::One(s) => std::slice::from_ref(s),
            RawValue::Many(v) => v,
        };
        slice.iter().map(String::as_str)
    }

    /// Whether every string is empty (or there are none).
    pub fn is_blank(&self) -> bool {
        self.iter().all(str::is_empty)
    }

    fn push(&mut self, value: String) {
        match self {
            RawValue::One(first) => {
                let first = std::mem::take(first);
                *self = RawValue::Many(vec![first, value]);
            }
            RawValue::Many(values) => values.push(value),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::One(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::One(s)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(v: Vec<String>) -> Self {
        RawValue::Many(v)
    }
}

impl From<&[&str]> for RawValue {
    fn from(v: &[&str]) -> Self {
        RawValue::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

/// An immutable snapshot of one incoming query's parameters.
///
/// Keys of `fields`, `filters` and `limit` are resource or relation names as sent by
/// the client (`fields[post]`, `filters[tags]`, `limit[comments]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParams {
    pub fields: BTreeMap<String, RawValue>,
    pub filters: BTreeMap<String, RawValue>,
    pub limit: BTreeMap<String, RawValue>,
    #[serde(alias = "sort")]
    pub sorting: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. Bracket keys (`fields[post]`, `filters[post][]`,
    /// `filters[post][0]`) collect into the per-resource maps; repeated keys
    /// accumulate. Unknown keys and bare `fields`/`filters`/`limit` are ignored.
    ///
    /// Filter strings keep their percent-escapes (only `+` becomes a space): the
    /// filter pass decodes them, so an encoded `%25` survives as a literal `%`.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key);
            match split_bracket_key(&key) {
                ("fields", Some(sub)) => {
                    insert(&mut params.fields, sub, decode_component(raw_value))
                }
                ("filters", Some(sub)) => {
                    insert(&mut params.filters, sub, raw_value.replace('+', " "))
                }
                ("limit", Some(sub)) => insert(&mut params.limit, sub, decode_component(raw_value)),
                ("sorting" | "sort", None) => params.sorting = Some(decode_component(raw_value)),
                ("page", None) => params.page = Some(decode_component(raw_value)),
                ("per_page", None) => params.per_page = Some(decode_component(raw_value)),
                _ => {}
            }
        }
        params
    }

    /// Set `fields[resource]`.
    pub fn field(mut self, resource: impl Into<String>, list: impl Into<RawValue>) -> Self {
        self.fields.insert(resource.into(), list.into());
        self
    }

    /// Add one `filters[resource]` entry.
    pub fn filter(mut self, resource: impl Into<String>, filter: impl Into<String>) -> Self {
        insert(&mut self.filters, resource.into().as_str(), filter.into());
        self
    }

    /// Set `limit[relation]`.
    pub fn limit(mut self, relation: impl Into<String>, limit: impl Into<String>) -> Self {
        self.limit
            .insert(relation.into(), RawValue::One(limit.into()));
        self
    }

    pub fn sorting(mut self, sorting: impl Into<String>) -> Self {
        self.sorting = Some(sorting.into());
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn per_page(mut self, per_page: impl Into<String>) -> Self {
        self.per_page = Some(per_page.into());
        self
    }
}

fn insert(map: &mut BTreeMap<String, RawValue>, key: &str, value: String) {
    match map.get_mut(key) {
        Some(existing) => existing.push(value),
        None => {
            map.insert(key.to_string(), RawValue::One(value));
        }
    }
}

/// Form-decode one key or value: `+` is a space, then percent-escapes.
fn decode_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Split `base[sub][...]` into `("base", Some("sub"))`. Trailing bracket groups are
/// ignored; an empty or unterminated first group yields `None`.
fn split_bracket_key(key: &str) -> (&str, Option<&str>) {
    let Some(open) = key.find('[') else {
        return (key, None);
    };
    let base = &key[..open];
    let rest = &key[open + 1..];
    match rest.find(']') {
        Some(0) | None => (base, None),
        Some(close) => (base, Some(&rest[..close])),
    }
}
